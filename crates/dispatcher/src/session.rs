use async_trait::async_trait;
use shared::{
    domain::{ChannelId, CommandId, GuildId},
    protocol::{
        CallbackKind, Choice, CommandDefinition, Interaction, InteractionResponse, MessageEdit,
        MessageRef, Modal, RegisteredCommand, ResponseData, EPHEMERAL,
    },
};

use crate::error::SessionError;

pub type SessionResult<T> = Result<T, SessionError>;

/// Outbound operations against the chat platform.
#[async_trait]
pub trait Session: Send + Sync {
    async fn respond(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> SessionResult<()>;

    /// Whether an initial response was already sent for `interaction`.
    async fn has_response(&self, interaction: &Interaction) -> bool;

    async fn edit_response(&self, interaction: &Interaction, edit: MessageEdit) -> SessionResult<()>;

    async fn delete_response(&self, interaction: &Interaction) -> SessionResult<()>;

    async fn send_message(&self, channel: &ChannelId, message: MessageEdit)
        -> SessionResult<MessageRef>;

    async fn edit_message(&self, message: &MessageRef, edit: MessageEdit) -> SessionResult<()>;

    async fn delete_message(&self, message: &MessageRef) -> SessionResult<()>;

    async fn list_commands(&self, guild: &GuildId) -> SessionResult<Vec<RegisteredCommand>>;

    async fn create_command(
        &self,
        guild: &GuildId,
        definition: &CommandDefinition,
    ) -> SessionResult<RegisteredCommand>;

    async fn delete_command(&self, guild: &GuildId, id: &CommandId) -> SessionResult<()>;

    async fn respond_deferred(&self, interaction: &Interaction, ephemeral: bool) -> SessionResult<()> {
        let data = ResponseData {
            flags: ephemeral.then_some(EPHEMERAL),
            ..ResponseData::default()
        };
        self.respond(
            interaction,
            InteractionResponse::new(CallbackKind::DeferredChannelMessage, data),
        )
        .await
    }

    async fn respond_deferred_update(&self, interaction: &Interaction) -> SessionResult<()> {
        self.respond(
            interaction,
            InteractionResponse {
                kind: CallbackKind::DeferredUpdateMessage,
                data: None,
            },
        )
        .await
    }

    /// Replaces the message the clicked component belongs to.
    async fn respond_update(&self, interaction: &Interaction, edit: MessageEdit) -> SessionResult<()> {
        self.respond(
            interaction,
            InteractionResponse::new(CallbackKind::UpdateMessage, edit.into()),
        )
        .await
    }

    async fn respond_message(
        &self,
        interaction: &Interaction,
        message: MessageEdit,
        ephemeral: bool,
    ) -> SessionResult<()> {
        let data = ResponseData {
            flags: ephemeral.then_some(EPHEMERAL),
            ..ResponseData::from(message)
        };
        self.respond(
            interaction,
            InteractionResponse::new(CallbackKind::ChannelMessage, data),
        )
        .await
    }

    async fn respond_ephemeral(&self, interaction: &Interaction, content: &str) -> SessionResult<()> {
        self.respond_message(interaction, MessageEdit::content(content), true)
            .await
    }

    async fn respond_modal(&self, interaction: &Interaction, modal: Modal) -> SessionResult<()> {
        self.respond(
            interaction,
            InteractionResponse::new(CallbackKind::Modal, modal.into()),
        )
        .await
    }

    async fn respond_choices(&self, interaction: &Interaction, choices: Vec<Choice>) -> SessionResult<()> {
        let data = ResponseData {
            choices: Some(choices),
            ..ResponseData::default()
        };
        self.respond(
            interaction,
            InteractionResponse::new(CallbackKind::AutocompleteResult, data),
        )
        .await
    }
}

/// Tells the user that handling their interaction failed.
///
/// Edits the existing response when there is one, otherwise answers with an
/// ephemeral message.
pub async fn respond_error(
    session: &dyn Session,
    interaction: &Interaction,
    message: &str,
) -> SessionResult<()> {
    if session.has_response(interaction).await {
        let edit = MessageEdit {
            content: Some(message.to_string()),
            embeds: Some(Vec::new()),
            components: Some(Vec::new()),
        };
        session.edit_response(interaction, edit).await
    } else {
        session.respond_ephemeral(interaction, message).await
    }
}
