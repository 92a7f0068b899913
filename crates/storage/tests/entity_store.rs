use std::collections::HashSet;

use shared::domain::{BroadcastMessage, Template};
use storage::EntityStore;

#[tokio::test]
async fn records_survive_reopening_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("templates");

    let mut template = Template::new("Weekend");
    template.welcome_message = "Welcome!".into();
    template.broadcast_message.push(BroadcastMessage {
        time: 120,
        message: "Join our discord".into(),
    });
    {
        let store = EntityStore::<Template>::open(&path).await.expect("open");
        store.save(&template).await.expect("save");
    }

    let store = EntityStore::<Template>::open(&path).await.expect("reopen");
    let found = store.find(&template.id).await.expect("find").expect("present");
    assert_eq!(found, template);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(path.join(&template.id)).expect("read"))
            .expect("json");
    assert_eq!(raw["welcome_message"], "Welcome!");
    assert_eq!(raw["broadcast_message"][0]["time"], 120);
}

#[tokio::test]
async fn all_loads_every_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EntityStore::<Template>::open(dir.path()).await.expect("open");
    let names: HashSet<&str> = HashSet::from(["one", "two", "three"]);
    for name in &names {
        store.save(&Template::new(*name)).await.expect("save");
    }

    let loaded = store.all().await.expect("all");
    let loaded: HashSet<String> = loaded.into_iter().map(|t| t.name).collect();
    assert_eq!(loaded.len(), 3);
    assert!(names.iter().all(|n| loaded.contains(*n)));
}
