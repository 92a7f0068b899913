use async_trait::async_trait;
use dispatcher::{unmarshal_options, Command, CommandResult, Session};
use serde::Deserialize;
use shared::{
    domain::Server,
    protocol::{CommandDefinition, Interaction, MessageEdit, OptionDefinition, OptionType},
};
use storage::EntityStore;
use tracing::info;

use super::{helper::ResultExt, Deps};

#[derive(Deserialize)]
struct AddServerRequest {
    name: String,
}

pub(crate) struct AddServerCommand {
    servers: EntityStore<Server>,
}

impl AddServerCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            servers: deps.servers.clone(),
        }
    }
}

#[async_trait]
impl Command for AddServerCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Adds a new server to the list of managed servers.").option(
            OptionDefinition::new(
                "name",
                "A custom name for the server. This is not the server name as it appears in the in-game server list",
                OptionType::String,
            )
            .required()
            .length(1, 255),
        )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let request: AddServerRequest = unmarshal_options(interaction.options())?;

        let server = Server::new(request.name);
        self.servers.save(&server).await.or_fail(
            "save-server",
            "There was an error saving the server. Please try again.",
        )?;
        info!(server_id = %server.server_id, name = %server.name, "server added");

        session
            .edit_response(
                interaction,
                MessageEdit::content(format!(
                    "The server with the name **{}** was added with ID {}.",
                    server.name, server.server_id
                )),
            )
            .await?;
        Ok(())
    }
}
