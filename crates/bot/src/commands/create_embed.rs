use async_trait::async_trait;
use dispatcher::{Command, CommandError, CommandResult, MessageComponent, Session};
use shared::{
    custom_id::{matches, tail},
    domain::Server,
    protocol::{
        Button, ButtonStyle, CommandDefinition, Component, Embed, Interaction, MessageEdit,
        MessageRef,
    },
};
use storage::{ConfigFile, EmbedMessage, EntityStore};
use tracing::{error, info, warn};

use super::{
    embeds::servers_panel,
    helper::{custom_id, ResultExt, COLOR_DARK_RED},
    Deps,
};

pub(crate) const CREATE_EMBED_PREFIX: &str = "create-embed";

const SEND_FAILED: &str = "Could not create a message with necessary message components.";

/// Posts the management message listing every server into the channel.
pub(crate) struct CreateEmbedCommand {
    servers: EntityStore<Server>,
    config: ConfigFile,
}

impl CreateEmbedCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            servers: deps.servers.clone(),
            config: deps.config.clone(),
        }
    }

    /// Sends a fresh management message and remembers where it lives.
    async fn create(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let channel = interaction.channel_id.as_ref().ok_or_else(|| {
            CommandError::rejected("create-embed", "This command can only be used in a channel.")
        })?;
        let panel = servers_panel(&self.servers).await?;
        let message = session
            .send_message(channel, panel)
            .await
            .or_fail("send-message", SEND_FAILED)?;
        info!(channel = %message.channel_id, message = %message.id, "management message created");

        self.config
            .update(|config| {
                config.embed_message = Some(EmbedMessage {
                    channel_id: message.channel_id,
                    message_id: message.id,
                })
            })
            .await
            .or_fail("save-config", "Could not remember the created message.")?;

        if let Err(error) = session.delete_response(interaction).await {
            error!(%error, "delete-response");
        }
        Ok(())
    }

    async fn on_confirm_recreate(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
    ) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        if let Some(existing) = self.config.snapshot().await.embed_message {
            let message = MessageRef {
                id: existing.message_id,
                channel_id: existing.channel_id,
            };
            if let Err(error) = session.delete_message(&message).await {
                warn!(%error, message = %message.id, "could not delete the existing management message");
            }
        }
        self.create(session, interaction).await
    }

    async fn on_refresh(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let message = interaction.message.as_ref().ok_or_else(|| {
            CommandError::rejected("refresh", "The message to refresh is unknown.")
        })?;
        let panel = servers_panel(&self.servers).await?;
        session
            .edit_message(message, panel)
            .await
            .or_fail("edit-message", SEND_FAILED)?;
        if let Err(error) = session.delete_response(interaction).await {
            error!(%error, "delete-response");
        }
        Ok(())
    }
}

#[async_trait]
impl Command for CreateEmbedCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(
            name,
            "Adds a message to this channel that allows discord users to manage registered servers.",
        )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        if self.config.snapshot().await.embed_message.is_none() {
            return self.create(session, interaction).await;
        }

        let embed = Embed {
            title: Some("Embed message already exists".into()),
            description: Some(
                "There is already an embed registered. Do you want to recreate it?".into(),
            ),
            color: Some(COLOR_DARK_RED),
            fields: Vec::new(),
        };
        let confirm = Button::new(
            ButtonStyle::Danger,
            "Yes, recreate",
            custom_id([CREATE_EMBED_PREFIX, "confirm-recreate"])?,
        );
        session
            .edit_response(
                interaction,
                MessageEdit::embeds(vec![embed], vec![Component::row([Component::Button(confirm)])]),
            )
            .await?;
        Ok(())
    }

    fn can_handle(&self, custom_id: &str) -> bool {
        matches(custom_id, CREATE_EMBED_PREFIX)
    }

    fn message_component(&self) -> Option<&dyn MessageComponent> {
        Some(self)
    }
}

#[async_trait]
impl MessageComponent for CreateEmbedCommand {
    async fn on_message_component(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
    ) -> CommandResult {
        let id = interaction.component_id().unwrap_or_default();
        match tail(id, CREATE_EMBED_PREFIX).unwrap_or_default().as_slice() {
            ["confirm-recreate"] => self.on_confirm_recreate(session, interaction).await,
            ["refresh"] => self.on_refresh(session, interaction).await,
            _ => Err(CommandError::rejected(
                "message-component",
                format!("Unknown action {id}."),
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/create_embed_tests.rs"]
mod tests;
