use std::collections::HashSet;

use shared::domain::{Server, Template};

use super::*;

async fn server_store() -> (tempfile::TempDir, EntityStore<Server>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = EntityStore::open(dir.path().join("servers"))
        .await
        .expect("open store");
    (dir, store)
}

#[tokio::test]
async fn open_creates_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("templates");
    let store = EntityStore::<Template>::open(&path).await.expect("open");
    assert!(path.is_dir());
    assert_eq!(store.dir(), path.as_path());
}

#[tokio::test]
async fn save_then_find_round_trips() {
    let (_dir, store) = server_store().await;
    let mut server = Server::new("EU #1");
    server.pending_update_mut().template_id = "tpl-1".into();
    store.save(&server).await.expect("save");

    let found = store.find(&server.server_id).await.expect("find");
    assert_eq!(found, Some(server));
}

#[tokio::test]
async fn find_missing_is_absent() {
    let (_dir, store) = server_store().await;
    assert_eq!(store.find("nope").await.expect("find"), None);
}

#[tokio::test]
async fn delete_removes_and_tolerates_missing() {
    let (_dir, store) = server_store().await;
    let server = Server::new("EU #2");
    store.save(&server).await.expect("save");
    store.delete(&server.server_id).await.expect("delete");
    assert_eq!(store.find(&server.server_id).await.expect("find"), None);
    store.delete(&server.server_id).await.expect("second delete");
}

#[tokio::test]
async fn list_returns_saved_ids_only() {
    let (_dir, store) = server_store().await;
    for id in ["a", "b"] {
        let mut server = Server::new(id);
        server.server_id = id.to_string();
        store.save(&server).await.expect("save");
    }
    std::fs::write(store.dir().join(".a.stale.tmp"), b"{").expect("stray temp file");
    std::fs::create_dir(store.dir().join("sub")).expect("subdir");

    let ids: HashSet<String> = store.list().await.expect("list").into_iter().collect();
    assert_eq!(ids, HashSet::from(["a".to_string(), "b".to_string()]));
}

#[tokio::test]
async fn rejects_ids_that_escape_the_directory() {
    let (_dir, store) = server_store().await;
    for id in ["", ".", "..", "../x", "a/b", ".hidden"] {
        let error = store.find(id).await.expect_err("invalid id");
        assert!(matches!(error, StoreError::InvalidId(_)), "{id:?}");
    }
}

#[tokio::test]
async fn malformed_record_is_a_serde_error() {
    let (_dir, store) = server_store().await;
    std::fs::write(store.dir().join("broken"), b"not json").expect("write");
    let error = store.find("broken").await.expect_err("malformed");
    assert!(matches!(error, StoreError::Serde { .. }));
}

#[tokio::test]
async fn update_mutates_and_persists() {
    let (_dir, store) = server_store().await;
    let server = Server::new("EU #3");
    store.save(&server).await.expect("save");

    let outcome = store
        .update(&server.server_id, |s| {
            s.pending_update_mut().server_name = "renamed".into();
            s.name.clone()
        })
        .await
        .expect("update");
    assert_eq!(outcome.as_deref(), Some("EU #3"));

    let found = store
        .find(&server.server_id)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(found.pending_update.expect("pending").server_name, "renamed");
}

#[tokio::test]
async fn update_on_missing_entity_returns_none() {
    let (_dir, store) = server_store().await;
    let outcome = store.update("missing", |_| ()).await.expect("update");
    assert!(outcome.is_none());
    assert!(store.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn concurrent_updates_are_not_lost() {
    let (_dir, store) = server_store().await;
    let mut template = Template::new("busy");
    template.id = "busy".into();
    let templates = EntityStore::<Template>::open(store.dir().with_file_name("templates"))
        .await
        .expect("open");
    templates.save(&template).await.expect("save");

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let templates = templates.clone();
        tasks.push(tokio::spawn(async move {
            templates
                .update("busy", |t| t.team_switch_cooldown += 1)
                .await
                .expect("update");
        }));
    }
    for task in tasks {
        task.await.expect("join");
    }

    let template = templates.find("busy").await.expect("find").expect("present");
    assert_eq!(template.team_switch_cooldown, 16);
}

#[tokio::test]
async fn update_releases_id_locks_when_done() {
    let (_dir, store) = server_store().await;
    let mut server = Server::new("EU #1");
    server.server_id = "srv-1".into();
    store.save(&server).await.expect("save");

    for n in 0..100 {
        let outcome = store.update(&format!("absent-{n}"), |_| ()).await.expect("update");
        assert!(outcome.is_none());
    }
    store
        .update("srv-1", |s| s.name = "EU #2".into())
        .await
        .expect("update")
        .expect("present");

    assert!(store.locks.lock().await.is_empty());
}

#[tokio::test]
async fn config_file_is_created_and_updated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    let config = ConfigFile::load_or_create(&path).await.expect("load");
    assert!(path.exists());
    assert_eq!(config.snapshot().await, Config::default());

    config
        .update(|c| {
            c.embed_message = Some(EmbedMessage {
                channel_id: "10".into(),
                message_id: "20".into(),
            })
        })
        .await
        .expect("update");

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("parse");
    assert_eq!(on_disk["embed_message"]["MessageId"], "20");
    assert!(on_disk["discord"].is_null());

    let reloaded = ConfigFile::load_or_create(&path).await.expect("reload");
    assert_eq!(reloaded.snapshot().await, config.snapshot().await);
}

#[tokio::test]
async fn config_file_reads_existing_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"discord":{"token":"abc","guild":"99"},"embed_message":{"ChannelId":"1","MessageId":"2"}}"#,
    )
    .expect("write");

    let config = ConfigFile::load_or_create(&path).await.expect("load").snapshot().await;
    let discord = config.discord.expect("discord");
    assert_eq!(discord.token, "abc");
    assert_eq!(discord.guild_id.expect("guild").as_str(), "99");
    assert_eq!(config.embed_message.expect("embed").channel_id.as_str(), "1");
}
