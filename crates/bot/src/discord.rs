use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dispatcher::{Session, SessionError, SessionResult};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ApplicationId, ChannelId, CommandId, GuildId, InteractionId},
    error::ApiError,
    protocol::{
        CommandDefinition, Interaction, InteractionResponse, MessageEdit, MessageRef,
        RegisteredCommand,
    },
};
use tokio::sync::Mutex;
use tracing::debug;

/// Interaction tokens stop working after this long.
const INTERACTION_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// [`Session`] over the Discord REST API.
pub struct RestSession {
    http: Client,
    api_url: String,
    token: String,
    application_id: ApplicationId,
    responded: Mutex<HashMap<InteractionId, Instant>>,
}

impl RestSession {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
        application_id: ApplicationId,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            application_id,
            responded: Mutex::default(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    fn original_response_url(&self, interaction: &Interaction) -> String {
        format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.api_url, interaction.application_id, interaction.token
        )
    }

    fn channel_message_url(&self, message: &MessageRef) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.api_url, message.channel_id, message.id
        )
    }

    fn guild_commands_url(&self, guild: &GuildId) -> String {
        format!(
            "{}/applications/{}/guilds/{}/commands",
            self.api_url, self.application_id, guild
        )
    }

    async fn mark_responded(&self, interaction: &Interaction) {
        let now = Instant::now();
        let mut responded = self.responded.lock().await;
        responded.retain(|_, at| now.duration_since(*at) < INTERACTION_TOKEN_TTL);
        responded.insert(interaction.id.clone(), now);
    }
}

async fn send(request: RequestBuilder) -> SessionResult<Response> {
    let response = request.send().await.map_err(SessionError::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ApiError>().await {
        Ok(error) => Err(SessionError::Api(error)),
        Err(_) => Err(SessionError::Status(status.as_u16())),
    }
}

async fn read<T: DeserializeOwned>(response: Response) -> SessionResult<T> {
    response.json().await.map_err(SessionError::transport)
}

#[async_trait]
impl Session for RestSession {
    async fn respond(
        &self,
        interaction: &Interaction,
        response: InteractionResponse,
    ) -> SessionResult<()> {
        let url = format!(
            "{}/interactions/{}/{}/callback",
            self.api_url, interaction.id, interaction.token
        );
        debug!(interaction = %interaction.id, kind = ?response.kind, "interaction callback");
        send(self.http.post(url).json(&response)).await?;
        self.mark_responded(interaction).await;
        Ok(())
    }

    async fn has_response(&self, interaction: &Interaction) -> bool {
        self.responded.lock().await.contains_key(&interaction.id)
    }

    async fn edit_response(&self, interaction: &Interaction, edit: MessageEdit) -> SessionResult<()> {
        let url = self.original_response_url(interaction);
        send(self.http.patch(url).json(&edit)).await?;
        Ok(())
    }

    async fn delete_response(&self, interaction: &Interaction) -> SessionResult<()> {
        let url = self.original_response_url(interaction);
        send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: MessageEdit,
    ) -> SessionResult<MessageRef> {
        let url = format!("{}/channels/{}/messages", self.api_url, channel);
        let response = send(self.authorized(self.http.post(url)).json(&message)).await?;
        read(response).await
    }

    async fn edit_message(&self, message: &MessageRef, edit: MessageEdit) -> SessionResult<()> {
        let url = self.channel_message_url(message);
        send(self.authorized(self.http.patch(url)).json(&edit)).await?;
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> SessionResult<()> {
        let url = self.channel_message_url(message);
        send(self.authorized(self.http.delete(url))).await?;
        Ok(())
    }

    async fn list_commands(&self, guild: &GuildId) -> SessionResult<Vec<RegisteredCommand>> {
        let url = self.guild_commands_url(guild);
        let response = send(self.authorized(self.http.get(url))).await?;
        read(response).await
    }

    async fn create_command(
        &self,
        guild: &GuildId,
        definition: &CommandDefinition,
    ) -> SessionResult<RegisteredCommand> {
        let url = self.guild_commands_url(guild);
        let response = send(self.authorized(self.http.post(url)).json(definition)).await?;
        read(response).await
    }

    async fn delete_command(&self, guild: &GuildId, id: &CommandId) -> SessionResult<()> {
        let url = format!("{}/{}", self.guild_commands_url(guild), id);
        send(self.authorized(self.http.delete(url))).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/discord_tests.rs"]
mod tests;
