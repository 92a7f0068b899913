use std::sync::Arc;

use async_trait::async_trait;
use dispatcher::{
    unmarshal_components, unmarshal_options, Autocomplete, Command, CommandError, CommandResult,
    MessageComponent, ModalSubmit, Session,
};
use remote_admin::{RemoteAdmin, REQUIRED_PERMISSIONS};
use serde::Deserialize;
use shared::{
    custom_id::{matches, peek},
    domain::{CrConCredentials, Server, TcAdminCredentials},
    protocol::{
        Button, ButtonStyle, CommandDefinition, Component, Embed, EmbedField, Interaction,
        MessageEdit, Modal, OptionDefinition, OptionType, TextInput, TextInputStyle,
    },
};
use storage::EntityStore;
use tracing::info;
use url::Url;

use super::{
    helper::{custom_id, find_server, focused_text, refresh_emoji, server_choices, ResultExt, COLOR_DARK_GREY},
    Deps,
};

const CREDENTIALS_PREFIX: &str = "credentials";

const VERIFY_FAILED: &str = "Could not verify permissions of the provided credentials.";
const SAVE_FAILED: &str = "Couldn't save server data.";

/// Pre-filled host of the panel most servers are rented from.
const DEFAULT_TCADMIN_HOST: &str = "qp.qonzer.com";

#[derive(Deserialize)]
struct CredentialsRequest {
    server: String,
}

#[derive(Deserialize)]
struct CrConForm {
    crcon_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TcAdminForm {
    base_url: String,
    service_id: String,
    username: String,
    password: String,
}

pub(crate) struct CredentialsCommand {
    servers: EntityStore<Server>,
    remote: Arc<dyn RemoteAdmin>,
}

impl CredentialsCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            servers: deps.servers.clone(),
            remote: deps.remote.clone(),
        }
    }

    async fn store(&self, sid: &str, set: impl FnOnce(&mut Server)) -> CommandResult {
        self.servers
            .update(sid, set)
            .await
            .or_fail("save-server", SAVE_FAILED)?
            .ok_or_else(|| CommandError::not_found(format!("server with ID {sid}")))
    }

    async fn on_confirm_crcon(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        let form: CrConForm = unmarshal_components(interaction.components())?;
        Url::parse(form.crcon_url.trim()).or_fail("parse-url", VERIFY_FAILED)?;
        session.respond_deferred(interaction, true).await?;
        find_server(&self.servers, sid).await?;

        let credentials = CrConCredentials {
            base_url: form.crcon_url.trim().to_string(),
            api_key: form.api_key,
        };
        let own = self
            .remote
            .crcon(&credentials)
            .or_fail("request-permissions", VERIFY_FAILED)?
            .own_permissions()
            .await
            .or_fail("request-permissions", VERIFY_FAILED)?;
        if !own.permissions.contains_only(REQUIRED_PERMISSIONS) {
            let provided: String = own.permissions.iter().map(|p| format!("{p}\n")).collect();
            let required: String = REQUIRED_PERMISSIONS.iter().map(|p| format!("{p}\n")).collect();
            return Err(CommandError::rejected(
                "permission-mismatch",
                format!(
                    "The provided API key grants more or less permissions than the required ones. Please only provide the required permissions.\n\nProvided:\n```\n{provided}```\n\nRequired:\n```\n{required}```"
                ),
            ));
        }

        self.store(sid, |server| server.crcon_credentials = Some(credentials))
            .await?;
        info!(server_id = %sid, "crcon credentials set");
        session
            .edit_response(
                interaction,
                MessageEdit::content("CRCon credentials set. Refresh the embed to see the new status."),
            )
            .await?;
        Ok(())
    }

    async fn on_confirm_tcadmin(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        sid: &str,
    ) -> CommandResult {
        let form: TcAdminForm = unmarshal_components(interaction.components())?;
        session.respond_deferred(interaction, true).await?;
        find_server(&self.servers, sid).await?;

        let credentials = TcAdminCredentials {
            base_url: form.base_url.trim().to_string(),
            service_id: form.service_id.trim().to_string(),
            username: form.username,
            password: form.password,
        };
        self.remote
            .tcadmin(&credentials)
            .or_fail("request-status", VERIFY_FAILED)?
            .server_info(&credentials.service_id)
            .await
            .or_fail("request-status", VERIFY_FAILED)?;

        self.store(sid, |server| server.tcadmin_credentials = Some(credentials))
            .await?;
        info!(server_id = %sid, "tcadmin credentials set");
        session
            .edit_response(
                interaction,
                MessageEdit::content("TCAdmin credentials set. Refresh the embed to see the new status."),
            )
            .await?;
        Ok(())
    }
}

fn credentials_panel(server: &Server) -> Result<MessageEdit, CommandError> {
    let crcon = server
        .crcon_credentials
        .as_ref()
        .map_or_else(|| "not set".to_string(), |c| c.base_url.clone());
    let tcadmin = server.tcadmin_credentials.as_ref().map_or_else(
        || "not set".to_string(),
        |c| format!("{} (Service ID: {})", c.base_url, c.service_id),
    );
    let embed = Embed {
        title: Some(server.name.clone()),
        description: None,
        color: Some(COLOR_DARK_GREY),
        fields: vec![
            EmbedField::new("ID", server.server_id.clone()),
            EmbedField::inline("CRCon Credentials", crcon),
            EmbedField::inline("TCAdmin Credentials", tcadmin),
        ],
    };

    let sid = server.server_id.as_str();
    let buttons = Component::row([
        Component::Button(Button::new(
            ButtonStyle::Primary,
            "Set CRCon",
            custom_id([CREDENTIALS_PREFIX, "set-crcon", sid])?,
        )),
        Component::Button(Button::new(
            ButtonStyle::Primary,
            "Set TCAdmin",
            custom_id([CREDENTIALS_PREFIX, "set-tcadmin", sid])?,
        )),
        Component::Button(Button::icon(
            ButtonStyle::Secondary,
            refresh_emoji(),
            custom_id([CREDENTIALS_PREFIX, "refresh", sid])?,
        )),
    ]);
    Ok(MessageEdit::embeds(vec![embed], vec![buttons]))
}

fn crcon_modal(sid: &str) -> Result<Modal, CommandError> {
    Ok(Modal {
        title: "Set CRCon Credentials".into(),
        custom_id: custom_id([CREDENTIALS_PREFIX, "confirm-crcon", sid])?,
        components: vec![
            Component::input_row(
                TextInput::new("crcon_url", "Community RCon URL", TextInputStyle::Short).required(),
            ),
            Component::input_row(
                TextInput::new("api_key", "API Key", TextInputStyle::Short).required(),
            ),
        ],
    })
}

fn tcadmin_modal(sid: &str) -> Result<Modal, CommandError> {
    Ok(Modal {
        title: "Set TCAdmin Credentials".into(),
        custom_id: custom_id([CREDENTIALS_PREFIX, "confirm-tcadmin", sid])?,
        components: vec![
            Component::input_row(
                TextInput::new("base_url", "Base URL without protocol", TextInputStyle::Short)
                    .with_value(DEFAULT_TCADMIN_HOST)
                    .required(),
            ),
            Component::input_row(
                TextInput::new("service_id", "Service ID", TextInputStyle::Short).required(),
            ),
            Component::input_row(
                TextInput::new("username", "Username", TextInputStyle::Short).required(),
            ),
            Component::input_row(
                TextInput::new("password", "Password", TextInputStyle::Short).required(),
            ),
        ],
    })
}

#[async_trait]
impl Command for CredentialsCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Manage credentials of a server").option(
            OptionDefinition::new(
                "server",
                "The server ID of which to manage credentials",
                OptionType::String,
            )
            .required()
            .autocomplete(),
        )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let request: CredentialsRequest = unmarshal_options(interaction.options())?;
        let server = find_server(&self.servers, &request.server).await?;
        session
            .edit_response(interaction, credentials_panel(&server)?)
            .await?;
        Ok(())
    }

    fn can_handle(&self, custom_id: &str) -> bool {
        matches(custom_id, CREDENTIALS_PREFIX)
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
impl Autocomplete for CredentialsCommand {
    async fn on_autocomplete(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let choices = server_choices(&self.servers, focused_text(interaction)).await?;
        session.respond_choices(interaction, choices).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageComponent for CredentialsCommand {
    async fn on_message_component(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
    ) -> CommandResult {
        let id = interaction.component_id().unwrap_or_default();
        let (sid, action) = peek(id);
        if action == format!("{CREDENTIALS_PREFIX}#set-crcon") {
            session.respond_modal(interaction, crcon_modal(sid)?).await?;
        } else if action == format!("{CREDENTIALS_PREFIX}#set-tcadmin") {
            session.respond_modal(interaction, tcadmin_modal(sid)?).await?;
        } else if action == format!("{CREDENTIALS_PREFIX}#refresh") {
            let server = find_server(&self.servers, sid).await?;
            session
                .respond_update(interaction, credentials_panel(&server)?)
                .await?;
        } else {
            return Err(CommandError::rejected(
                "message-component",
                format!("Unknown action {id}."),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ModalSubmit for CredentialsCommand {
    async fn on_modal_submit(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let id = interaction.modal_id().unwrap_or_default();
        let (sid, action) = peek(id);
        if action == format!("{CREDENTIALS_PREFIX}#confirm-crcon") {
            self.on_confirm_crcon(session, interaction, sid).await
        } else if action == format!("{CREDENTIALS_PREFIX}#confirm-tcadmin") {
            self.on_confirm_tcadmin(session, interaction, sid).await
        } else {
            Err(CommandError::rejected(
                "modal-submit",
                format!("Unknown action {id}."),
            ))
        }
    }
}

#[cfg(test)]
#[path = "tests/credentials_tests.rs"]
mod tests;
