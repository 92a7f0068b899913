//! Prepares changes to one server and applies them in a single step.

use std::sync::Arc;

use async_trait::async_trait;
use dispatcher::{
    unmarshal_components, unmarshal_options, Autocomplete, Command, CommandError, CommandResult,
    MessageComponent, ModalSubmit, Session,
};
use remote_admin::{
    AutoBroadcastConfig, BroadcastEntry, CrCon, RemoteAdmin, RemoteResult, TcAdmin,
};
use serde::Deserialize;
use shared::{
    custom_id::{matches, tail},
    domain::{Server, ServerUpdate, TcAdminCredentials, Template},
    protocol::{
        CommandDefinition, Component, Interaction, MessageEdit, Modal, OptionDefinition,
        OptionType, TextInput, TextInputStyle,
    },
};
use storage::EntityStore;
use tracing::{info, warn};

use super::{
    embeds::server_panel,
    helper::{custom_id, find_server, find_template, focused_text, selected, server_choices, ResultExt},
    Deps,
};

pub(crate) const EMBED_PREFIX: &str = "embed";

const SAVE_FAILED: &str = "Error saving server.";

#[derive(Deserialize)]
struct ManageServerRequest {
    server: String,
}

#[derive(Deserialize)]
struct NamePasswordRequest {
    name: String,
    password: String,
}

pub(crate) struct ManageServerCommand {
    servers: EntityStore<Server>,
    templates: EntityStore<Template>,
    remote: Arc<dyn RemoteAdmin>,
}

impl ManageServerCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            servers: deps.servers.clone(),
            templates: deps.templates.clone(),
            remote: deps.remote.clone(),
        }
    }

    async fn panel(&self, server: &Server) -> Result<MessageEdit, CommandError> {
        server_panel(&self.templates, self.remote.as_ref(), server).await
    }

    /// Applies `mutate` to the stored server and returns the updated record.
    async fn update_server(
        &self,
        sid: &str,
        mutate: impl FnOnce(&mut Server),
    ) -> Result<Server, CommandError> {
        self.servers
            .update(sid, |server| {
                mutate(server);
                server.clone()
            })
            .await
            .or_fail("save-server", SAVE_FAILED)?
            .ok_or_else(|| CommandError::not_found(format!("server with ID {sid}")))
    }

    /// Forgets any pending changes and shows the panel as a private reply.
    async fn show_server(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let server = self
            .update_server(sid, |server| server.pending_update = None)
            .await?;
        let panel = self.panel(&server).await?;
        session.edit_response(interaction, panel).await?;
        Ok(())
    }

    async fn on_select_template(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        let template_id = selected(interaction, "select-template")?;
        let template = find_template(&self.templates, template_id).await?;
        let server = self
            .update_server(sid, |server| {
                server.pending_update_mut().template_id = template.id;
            })
            .await?;
        let panel = self.panel(&server).await?;
        session.respond_update(interaction, panel).await?;
        Ok(())
    }

    async fn on_set_name_password(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        let server = find_server(&self.servers, sid).await?;
        let pending = server.pending_update.unwrap_or_default();
        let modal = Modal {
            title: "Set Server Name and Password".into(),
            custom_id: custom_id([EMBED_PREFIX, "confirm-name-password", sid])?,
            components: vec![
                Component::input_row(
                    TextInput::new("name", "Name", TextInputStyle::Short)
                        .with_value(pending.server_name),
                ),
                Component::input_row(
                    TextInput::new("password", "Password", TextInputStyle::Short)
                        .with_value(pending.server_password),
                ),
            ],
        };
        session.respond_modal(interaction, modal).await?;
        Ok(())
    }

    async fn on_refresh(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        let server = find_server(&self.servers, sid).await?;
        let panel = self.panel(&server).await?;
        session.respond_update(interaction, panel).await?;
        Ok(())
    }

    async fn on_save_restart(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        session.respond_deferred_update(interaction).await?;

        let server = find_server(&self.servers, sid).await?;
        let Some(pending) = server.pending_update.clone() else {
            return Err(CommandError::rejected(
                "save-restart",
                "There is no pending update for this server. Please start over by selecting the server again.",
            ));
        };
        let (Some(crcon), Some(tcadmin)) = (&server.crcon_credentials, &server.tcadmin_credentials)
        else {
            return Err(CommandError::rejected(
                "save-restart",
                format!("The server with ID {sid} has no credentials configured. Set them with /credentials first."),
            ));
        };

        let mut failures = Vec::new();
        if !pending.template_id.is_empty() {
            let template = find_template(&self.templates, &pending.template_id).await?;
            match self.remote.crcon(crcon) {
                Ok(client) => apply_template(client.as_ref(), &template, &mut failures).await,
                Err(error) => failures.push(format!("connecting to CRCon: {error}")),
            }
        }
        if pending.requires_restart() {
            match self.remote.tcadmin(tcadmin) {
                Ok(client) => {
                    apply_name_password(client.as_ref(), tcadmin, &pending, &mut failures).await
                }
                Err(error) => failures.push(format!("updating Server name and password: {error}")),
            }
        }

        self.update_server(sid, |server| server.pending_update = None)
            .await?;
        info!(server_id = %sid, failures = failures.len(), "pending update applied");

        let message = if failures.is_empty() {
            "The server was successfully prepared.".to_string()
        } else {
            let mut message = String::from(
                "Some settings could not be updated. Any not mentioned setting was made successfully. Errors:\n\n",
            );
            for failure in &failures {
                message.push_str(&format!("* {failure}\n"));
            }
            message
        };
        session
            .edit_response(
                interaction,
                MessageEdit {
                    content: Some(message),
                    embeds: Some(Vec::new()),
                    components: Some(Vec::new()),
                },
            )
            .await?;
        Ok(())
    }
}

async fn apply_template(crcon: &dyn CrCon, template: &Template, failures: &mut Vec<String>) {
    let broadcast = AutoBroadcastConfig {
        enabled: true,
        randomize: false,
        messages: template
            .broadcast_message
            .iter()
            .map(|m| BroadcastEntry {
                time_sec: m.time,
                message: m.message.clone(),
            })
            .collect(),
    };
    record(
        failures,
        "updating Auto-Broadcast",
        crcon.set_auto_broadcast_config(&broadcast).await,
    );
    record(
        failures,
        "updating Welcome message",
        crcon.set_welcome_message(&template.welcome_message).await,
    );
    record(
        failures,
        "updating Team-Switch-Cooldown",
        crcon.set_team_switch_cooldown(template.team_switch_cooldown).await,
    );
    record(
        failures,
        "updating Auto-Balance threshold",
        crcon
            .set_autobalance_threshold(template.auto_balance_threshold)
            .await,
    );
    record(
        failures,
        "updating Profanities",
        crcon.set_profanities(&template.profanity_filter).await,
    );
}

/// Sets the pending name and password and restarts the server when that
/// succeeded.
async fn apply_name_password(
    tcadmin: &dyn TcAdmin,
    credentials: &TcAdminCredentials,
    pending: &ServerUpdate,
    failures: &mut Vec<String>,
) {
    let service_id = credentials.service_id.as_str();
    let updated = set_name_password(tcadmin, service_id, pending).await;
    if record(failures, "updating Server name and password", updated) {
        let restart = tcadmin.restart(service_id).await.map(|_| ());
        record(failures, "restarting server", restart);
    }
}

/// Whichever of name and password was left empty keeps its live value.
async fn set_name_password(
    tcadmin: &dyn TcAdmin,
    service_id: &str,
    pending: &ServerUpdate,
) -> RemoteResult<()> {
    let mut name = pending.server_name.clone();
    let mut password = pending.server_password.clone();
    if name.is_empty() || password.is_empty() {
        let live = tcadmin.server_info(service_id).await?;
        if name.is_empty() {
            name = live.name;
        }
        if password.is_empty() {
            password = live.password;
        }
    }
    tcadmin.set_server_info(service_id, &name, &password).await
}

fn record(failures: &mut Vec<String>, step: &str, result: RemoteResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            warn!(step, %error, "server update step failed");
            failures.push(format!("{step}: {error}"));
            false
        }
    }
}

#[async_trait]
impl Command for ManageServerCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Shows the details of a server and prepares changes to it").option(
            OptionDefinition::new("server", "The server ID to manage", OptionType::String)
                .required()
                .autocomplete(),
        )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let request: ManageServerRequest = unmarshal_options(interaction.options())?;
        self.show_server(session, interaction, &request.server).await
    }

    fn can_handle(&self, custom_id: &str) -> bool {
        matches(custom_id, EMBED_PREFIX)
    }

    fn autocomplete(&self) -> Option<&dyn Autocomplete> {
        Some(self)
    }

    fn message_component(&self) -> Option<&dyn MessageComponent> {
        Some(self)
    }

    fn modal_submit(&self) -> Option<&dyn ModalSubmit> {
        Some(self)
    }
}

#[async_trait]
impl Autocomplete for ManageServerCommand {
    async fn on_autocomplete(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let choices = server_choices(&self.servers, focused_text(interaction)).await?;
        session.respond_choices(interaction, choices).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageComponent for ManageServerCommand {
    async fn on_message_component(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
    ) -> CommandResult {
        let id = interaction.component_id().unwrap_or_default();
        let tokens = tail(id, EMBED_PREFIX).unwrap_or_default();
        match tokens.as_slice() {
            ["select-server"] => {
                let sid = selected(interaction, "select-server")?;
                self.show_server(session, interaction, sid).await
            }
            ["select-template", sid] => self.on_select_template(session, interaction, sid).await,
            ["set-name-password", sid] => self.on_set_name_password(session, interaction, sid).await,
            ["refresh", sid] => self.on_refresh(session, interaction, sid).await,
            ["save-restart", sid] => self.on_save_restart(session, interaction, sid).await,
            _ => Err(CommandError::rejected(
                "message-component",
                format!("Unknown action {id}."),
            )),
        }
    }
}

#[async_trait]
impl ModalSubmit for ManageServerCommand {
    async fn on_modal_submit(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let id = interaction.modal_id().unwrap_or_default();
        let tokens = tail(id, EMBED_PREFIX).unwrap_or_default();
        let ["confirm-name-password", sid] = tokens.as_slice() else {
            return Err(CommandError::rejected(
                "modal-submit",
                format!("Unknown action {id}."),
            ));
        };

        let request: NamePasswordRequest = unmarshal_components(interaction.components())?;
        let server = self
            .update_server(sid, |server| {
                let pending = server.pending_update_mut();
                pending.server_name = request.name;
                pending.server_password = request.password;
            })
            .await?;
        let panel = self.panel(&server).await?;
        session.respond_update(interaction, panel).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/manage_server_tests.rs"]
mod tests;
