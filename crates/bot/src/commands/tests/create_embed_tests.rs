use shared::{domain::ChannelId, protocol::ButtonStyle};

use super::*;
use crate::fakes::{command, component, custom_ids, Call, Harness, CHANNEL};

#[tokio::test]
async fn posts_the_management_message_and_remembers_it() {
    let harness = Harness::new().await;
    harness.server("srv-1", "EU #1").await;

    harness
        .dispatcher
        .dispatch(&command("create-embed", Vec::new()))
        .await
        .expect("dispatch");

    let calls = harness.session.calls();
    let sent = calls
        .iter()
        .find_map(|c| match c {
            Call::SendMessage(channel, message) => Some((channel.clone(), message.clone())),
            _ => None,
        })
        .expect("message sent");
    assert_eq!(sent.0, ChannelId::from(CHANNEL));
    assert_eq!(
        custom_ids(&sent.1.components.expect("components")),
        vec!["embed#select-server", "create-embed#refresh"]
    );
    assert_eq!(calls.last(), Some(&Call::DeleteResponse));

    let stored = harness.deps.config.snapshot().await.embed_message.expect("embed");
    assert_eq!(stored.message_id.as_str(), "message-1");
    assert_eq!(stored.channel_id.as_str(), CHANNEL);
}

#[tokio::test]
async fn existing_message_asks_before_recreating() {
    let harness = Harness::new().await;
    harness
        .dispatcher
        .dispatch(&command("create-embed", Vec::new()))
        .await
        .expect("first");
    harness.session.clear();

    harness
        .dispatcher
        .dispatch(&command("create-embed", Vec::new()))
        .await
        .expect("second");

    let edit = harness.session.last_edit().expect("question");
    let embed = &edit.embeds.as_ref().expect("embeds")[0];
    assert_eq!(embed.title.as_deref(), Some("Embed message already exists"));
    let components = edit.components.expect("components");
    assert_eq!(custom_ids(&components), vec!["create-embed#confirm-recreate"]);
    let Component::ActionRow(row) = &components[0] else {
        panic!("expected an action row");
    };
    let Component::Button(button) = &row[0] else {
        panic!("expected a button");
    };
    assert_eq!(button.style, ButtonStyle::Danger);
    assert!(!harness
        .session
        .calls()
        .iter()
        .any(|c| matches!(c, Call::SendMessage(..))));
}

#[tokio::test]
async fn recreate_replaces_the_previous_message() {
    let harness = Harness::new().await;
    harness
        .dispatcher
        .dispatch(&command("create-embed", Vec::new()))
        .await
        .expect("create");

    harness
        .dispatcher
        .dispatch(&component("create-embed#confirm-recreate", &[]))
        .await
        .expect("recreate");

    let deleted: Vec<_> = harness
        .session
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::DeleteMessage(message) => Some(message.id),
            _ => None,
        })
        .collect();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].as_str(), "message-1");
    let stored = harness.deps.config.snapshot().await.embed_message.expect("embed");
    assert_eq!(stored.message_id.as_str(), "message-2");
}

#[tokio::test]
async fn refresh_edits_the_clicked_message() {
    let harness = Harness::new().await;
    harness.server("srv-1", "EU #1").await;

    harness
        .dispatcher
        .dispatch(&component("create-embed#refresh", &[]))
        .await
        .expect("dispatch");

    let edited = harness
        .session
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::EditMessage(message, edit) => Some((message, edit)),
            _ => None,
        })
        .expect("message edited");
    assert_eq!(edited.0.id.as_str(), "panel-message");
    let options = match &edited.1.components.expect("components")[0] {
        Component::ActionRow(row) => match &row[0] {
            Component::SelectMenu(menu) => menu.options.clone(),
            other => panic!("expected a select menu, got {other:?}"),
        },
        other => panic!("expected an action row, got {other:?}"),
    };
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].value, "srv-1");
    assert_eq!(options[0].label, "EU #1");
}
