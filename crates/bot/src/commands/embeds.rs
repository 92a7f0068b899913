//! The management message and the per-server panel.

use dispatcher::CommandError;
use remote_admin::RemoteAdmin;
use shared::{
    domain::{Server, Template},
    protocol::{
        Button, ButtonStyle, Component, Embed, EmbedField, MessageEdit, SelectMenu, SelectOption,
    },
};
use storage::EntityStore;

use super::{
    create_embed::CREATE_EMBED_PREFIX,
    helper::{custom_id, refresh_emoji, ResultExt, COLOR_DARK_BLUE, COLOR_DARK_GREY, MAX_CHOICES},
    manage_server::EMBED_PREFIX,
};

const NOT_CONFIGURED: &str = "not configured";
const PANEL_DESCRIPTION: &str = "See the server details below. You can change details, which are only applied when you confirm the changes. The server might then be restarted!";

const COMPONENTS_FAILED: &str = "There was an error creating the message components.";

/// The channel message listing every managed server.
pub(crate) async fn servers_panel(servers: &EntityStore<Server>) -> Result<MessageEdit, CommandError> {
    let mut servers = servers
        .all()
        .await
        .or_fail("create-message-embeds", COMPONENTS_FAILED)?;
    servers.sort_by(|a, b| a.name.cmp(&b.name));

    let embed = Embed {
        title: Some("Managed servers".into()),
        description: Some("Select a server to see its details and prepare changes.".into()),
        color: Some(COLOR_DARK_GREY),
        fields: Vec::new(),
    };

    let mut components = Vec::new();
    if !servers.is_empty() {
        components.push(Component::row([Component::SelectMenu(SelectMenu {
            custom_id: custom_id([EMBED_PREFIX, "select-server"])?,
            placeholder: Some(placeholder("Select a server", servers.len())),
            options: servers
                .into_iter()
                .take(MAX_CHOICES)
                .map(|s| SelectOption {
                    label: s.name,
                    value: s.server_id,
                    description: None,
                })
                .collect(),
        })]));
    }
    components.push(Component::row([Component::Button(Button::icon(
        ButtonStyle::Secondary,
        refresh_emoji(),
        custom_id([CREATE_EMBED_PREFIX, "refresh"])?,
    ))]));

    Ok(MessageEdit::embeds(vec![embed], components))
}

/// Live state of one server next to the changes pending for it.
pub(crate) async fn server_panel(
    templates: &EntityStore<Template>,
    remote: &dyn RemoteAdmin,
    server: &Server,
) -> Result<MessageEdit, CommandError> {
    let (live_name, live_password) = match &server.tcadmin_credentials {
        Some(credentials) => {
            let info = remote
                .tcadmin(credentials)
                .or_fail("create-message-embeds", COMPONENTS_FAILED)?
                .server_info(&credentials.service_id)
                .await
                .or_fail("create-message-embeds", COMPONENTS_FAILED)?;
            (info.name, info.password)
        }
        None => (NOT_CONFIGURED.to_string(), NOT_CONFIGURED.to_string()),
    };

    let player_count = match &server.crcon_credentials {
        Some(credentials) => remote
            .crcon(credentials)
            .or_fail("create-message-embeds", COMPONENTS_FAILED)?
            .player_ids()
            .await
            .or_fail("create-message-embeds", COMPONENTS_FAILED)?
            .len()
            .to_string(),
        None => NOT_CONFIGURED.to_string(),
    };

    let mut templates = templates
        .all()
        .await
        .or_fail("create-message-embeds", COMPONENTS_FAILED)?;
    templates.sort_by(|a, b| a.name.cmp(&b.name));

    let pending = server.pending_update.clone().unwrap_or_default();
    let template_name = templates
        .iter()
        .find(|t| t.id == pending.template_id)
        .map_or("not set", |t| t.name.as_str())
        .to_string();

    let embed = Embed {
        title: Some(server.name.clone()),
        description: Some(PANEL_DESCRIPTION.into()),
        color: Some(COLOR_DARK_BLUE),
        fields: vec![
            EmbedField::new("Player Count", player_count),
            EmbedField::new("Template", template_name),
            EmbedField::inline("Server Name", pending_change(&live_name, &pending.server_name)),
            EmbedField::inline(
                "Server Password",
                pending_change(&live_password, &pending.server_password),
            ),
        ],
    };

    let sid = server.server_id.as_str();
    let mut components = Vec::new();
    if !templates.is_empty() {
        components.push(Component::row([Component::SelectMenu(SelectMenu {
            custom_id: custom_id([EMBED_PREFIX, "select-template", sid])?,
            placeholder: Some(placeholder("Select a template", templates.len())),
            options: templates
                .into_iter()
                .take(MAX_CHOICES)
                .map(|t| SelectOption {
                    label: t.name,
                    value: t.id,
                    description: None,
                })
                .collect(),
        })]));
    }
    components.push(Component::row([
        Component::Button(Button::new(
            ButtonStyle::Primary,
            "Save and restart",
            custom_id([EMBED_PREFIX, "save-restart", sid])?,
        )),
        Component::Button(Button::new(
            ButtonStyle::Secondary,
            "Set Name & Password",
            custom_id([EMBED_PREFIX, "set-name-password", sid])?,
        )),
        Component::Button(Button::icon(
            ButtonStyle::Secondary,
            refresh_emoji(),
            custom_id([EMBED_PREFIX, "refresh", sid])?,
        )),
    ]));

    Ok(MessageEdit::embeds(vec![embed], components))
}

/// Select menus hold at most [`MAX_CHOICES`] options; say so when some are cut.
fn placeholder(text: &str, total: usize) -> String {
    if total > MAX_CHOICES {
        format!("{text} (first {MAX_CHOICES} of {total})")
    } else {
        text.to_string()
    }
}

fn pending_change(current: &str, pending: &str) -> String {
    if pending.is_empty() {
        current.to_string()
    } else {
        format!("~~{current}~~ -> {pending}")
    }
}
