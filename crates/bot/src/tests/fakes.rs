//! Recording stand-ins for the platform session and the remote administration APIs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dispatcher::{Dispatcher, Session, SessionResult};
use remote_admin::{
    AutoBroadcastConfig, CrCon, OwnPermissions, Permissions, RemoteAdmin, RemoteError,
    RemoteResult, ServerInfo, ServerSettings, TcAdmin, REQUIRED_PERMISSIONS,
};
use serde_json::Value;
use shared::{
    domain::{ChannelId, CommandId, CrConCredentials, GuildId, Server, TcAdminCredentials, Template},
    protocol::{
        CommandDefinition, CommandOption, Component, Interaction, InteractionData,
        InteractionKind, InteractionResponse, MessageEdit, MessageRef, RegisteredCommand,
        TextInput,
    },
};
use storage::{ConfigFile, EntityStore};
use tempfile::TempDir;

use crate::commands::{self, Deps};

pub(crate) const GUILD: &str = "guild-1";
pub(crate) const CHANNEL: &str = "channel-1";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Respond(InteractionResponse),
    EditResponse(MessageEdit),
    DeleteResponse,
    SendMessage(ChannelId, MessageEdit),
    EditMessage(MessageRef, MessageEdit),
    DeleteMessage(MessageRef),
}

#[derive(Default)]
pub(crate) struct FakeSession {
    calls: Mutex<Vec<Call>>,
}

impl FakeSession {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().expect("calls").clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls").push(call);
    }

    /// Content of the last edit to the original response.
    pub(crate) fn last_edit(&self) -> Option<MessageEdit> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::EditResponse(edit) => Some(edit),
            _ => None,
        })
    }

    pub(crate) fn last_response(&self) -> Option<InteractionResponse> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Respond(response) => Some(response),
            _ => None,
        })
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn respond(
        &self,
        _interaction: &Interaction,
        response: InteractionResponse,
    ) -> SessionResult<()> {
        self.record(Call::Respond(response));
        Ok(())
    }

    async fn has_response(&self, _interaction: &Interaction) -> bool {
        self.calls().iter().any(|c| matches!(c, Call::Respond(_)))
    }

    async fn edit_response(&self, _interaction: &Interaction, edit: MessageEdit) -> SessionResult<()> {
        self.record(Call::EditResponse(edit));
        Ok(())
    }

    async fn delete_response(&self, _interaction: &Interaction) -> SessionResult<()> {
        self.record(Call::DeleteResponse);
        Ok(())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        message: MessageEdit,
    ) -> SessionResult<MessageRef> {
        let sent = self
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::SendMessage(..)))
            .count();
        self.record(Call::SendMessage(channel.clone(), message));
        Ok(MessageRef {
            id: format!("message-{}", sent + 1).as_str().into(),
            channel_id: channel.clone(),
        })
    }

    async fn edit_message(&self, message: &MessageRef, edit: MessageEdit) -> SessionResult<()> {
        self.record(Call::EditMessage(message.clone(), edit));
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> SessionResult<()> {
        self.record(Call::DeleteMessage(message.clone()));
        Ok(())
    }

    async fn list_commands(&self, _guild: &GuildId) -> SessionResult<Vec<RegisteredCommand>> {
        Ok(Vec::new())
    }

    async fn create_command(
        &self,
        _guild: &GuildId,
        definition: &CommandDefinition,
    ) -> SessionResult<RegisteredCommand> {
        Ok(RegisteredCommand {
            id: CommandId::from(definition.name.as_str()),
            name: definition.name.clone(),
            description: definition.description.clone(),
        })
    }

    async fn delete_command(&self, _guild: &GuildId, _id: &CommandId) -> SessionResult<()> {
        Ok(())
    }
}

pub(crate) struct FakeCrCon {
    pub(crate) fail: Option<&'static str>,
    pub(crate) permissions: Vec<String>,
    pub(crate) players: usize,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl Default for FakeCrCon {
    fn default() -> Self {
        Self {
            fail: None,
            permissions: REQUIRED_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
            players: 0,
            calls: Mutex::default(),
        }
    }
}

impl FakeCrCon {
    pub(crate) fn failing(op: &'static str) -> Self {
        Self {
            fail: Some(op),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    fn call(&self, op: &'static str, detail: String) -> RemoteResult<()> {
        self.calls.lock().expect("calls").push(format!("{op} {detail}"));
        if self.fail == Some(op) {
            return Err(RemoteError::UnexpectedStatus(500));
        }
        Ok(())
    }
}

#[async_trait]
impl CrCon for FakeCrCon {
    async fn set_team_switch_cooldown(&self, minutes: i64) -> RemoteResult<()> {
        self.call("team-switch-cooldown", minutes.to_string())
    }

    async fn set_autobalance_threshold(&self, max_diff: i64) -> RemoteResult<()> {
        self.call("autobalance-threshold", max_diff.to_string())
    }

    async fn set_welcome_message(&self, message: &str) -> RemoteResult<()> {
        self.call("welcome-message", message.to_string())
    }

    async fn welcome_message(&self) -> RemoteResult<String> {
        self.call("get-welcome-message", String::new())?;
        Ok(String::new())
    }

    async fn server_settings(&self) -> RemoteResult<ServerSettings> {
        self.call("server-settings", String::new())?;
        Ok(ServerSettings::default())
    }

    async fn player_ids(&self) -> RemoteResult<Vec<String>> {
        self.call("player-ids", String::new())?;
        Ok((0..self.players).map(|i| format!("player-{i}")).collect())
    }

    async fn own_permissions(&self) -> RemoteResult<OwnPermissions> {
        self.call("own-permissions", String::new())?;
        Ok(OwnPermissions {
            user_name: "bot".into(),
            is_supervisor: false,
            permissions: Permissions(self.permissions.clone()),
        })
    }

    async fn set_auto_broadcast_config(&self, config: &AutoBroadcastConfig) -> RemoteResult<()> {
        self.call("auto-broadcast", config.messages.len().to_string())
    }

    async fn set_profanities(&self, profanities: &[String]) -> RemoteResult<()> {
        self.call("profanities", profanities.join(","))
    }
}

pub(crate) struct FakeTcAdmin {
    pub(crate) fail: Option<&'static str>,
    pub(crate) info: ServerInfo,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl Default for FakeTcAdmin {
    fn default() -> Self {
        Self {
            fail: None,
            info: ServerInfo {
                name: "Live name".into(),
                password: "live-pw".into(),
            },
            calls: Mutex::default(),
        }
    }
}

impl FakeTcAdmin {
    pub(crate) fn failing(op: &'static str) -> Self {
        Self {
            fail: Some(op),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    fn call(&self, op: &'static str, detail: String) -> RemoteResult<()> {
        self.calls.lock().expect("calls").push(format!("{op} {detail}"));
        if self.fail == Some(op) {
            return Err(RemoteError::Forbidden);
        }
        Ok(())
    }
}

#[async_trait]
impl TcAdmin for FakeTcAdmin {
    async fn server_info(&self, service_id: &str) -> RemoteResult<ServerInfo> {
        self.call("server-info", service_id.to_string())?;
        Ok(self.info.clone())
    }

    async fn set_server_info(&self, service_id: &str, name: &str, password: &str) -> RemoteResult<()> {
        self.call("set-server-info", format!("{service_id} {name} {password}"))
    }

    async fn restart(&self, service_id: &str) -> RemoteResult<String> {
        self.call("restart", service_id.to_string())?;
        Ok("restarting".into())
    }
}

pub(crate) struct FakeRemote {
    pub(crate) crcon: Arc<FakeCrCon>,
    pub(crate) tcadmin: Arc<FakeTcAdmin>,
}

impl RemoteAdmin for FakeRemote {
    fn crcon(&self, _credentials: &CrConCredentials) -> RemoteResult<Arc<dyn CrCon>> {
        Ok(self.crcon.clone())
    }

    fn tcadmin(&self, _credentials: &TcAdminCredentials) -> RemoteResult<Arc<dyn TcAdmin>> {
        Ok(self.tcadmin.clone())
    }
}

/// A fully wired bot over temporary stores and recording fakes.
pub(crate) struct Harness {
    pub(crate) _dir: TempDir,
    pub(crate) deps: Deps,
    pub(crate) session: Arc<FakeSession>,
    pub(crate) crcon: Arc<FakeCrCon>,
    pub(crate) tcadmin: Arc<FakeTcAdmin>,
    pub(crate) dispatcher: Dispatcher,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        Self::with_remotes(FakeCrCon::default(), FakeTcAdmin::default()).await
    }

    pub(crate) async fn with_remotes(crcon: FakeCrCon, tcadmin: FakeTcAdmin) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let crcon = Arc::new(crcon);
        let tcadmin = Arc::new(tcadmin);
        let deps = Deps {
            servers: EntityStore::open(dir.path().join("servers"))
                .await
                .expect("servers"),
            templates: EntityStore::open(dir.path().join("templates"))
                .await
                .expect("templates"),
            config: ConfigFile::load_or_create(dir.path().join("config.json"))
                .await
                .expect("config"),
            remote: Arc::new(FakeRemote {
                crcon: crcon.clone(),
                tcadmin: tcadmin.clone(),
            }),
        };
        let session = Arc::new(FakeSession::default());
        let mut dispatcher = Dispatcher::new(GuildId::from(GUILD), session.clone());
        commands::register_all(&mut dispatcher, &deps).expect("register");
        Self {
            _dir: dir,
            deps,
            session,
            crcon,
            tcadmin,
            dispatcher,
        }
    }

    /// Stores a server with both credential sets.
    pub(crate) async fn server(&self, id: &str, name: &str) -> Server {
        let server = Server {
            server_id: id.into(),
            name: name.into(),
            crcon_credentials: Some(CrConCredentials {
                base_url: "https://rcon.example.com".into(),
                api_key: "key".into(),
            }),
            tcadmin_credentials: Some(TcAdminCredentials {
                base_url: "panel.example.com".into(),
                service_id: "svc-1".into(),
                username: "admin".into(),
                password: "pw".into(),
            }),
            pending_update: None,
        };
        self.deps.servers.save(&server).await.expect("save server");
        server
    }

    pub(crate) async fn template(&self, id: &str, name: &str) -> Template {
        let template = Template {
            id: id.into(),
            name: name.into(),
            ..Template::default()
        };
        self.deps.templates.save(&template).await.expect("save template");
        template
    }
}

fn interaction(kind: InteractionKind, data: InteractionData) -> Interaction {
    Interaction {
        id: "interaction-1".into(),
        application_id: "app-1".into(),
        kind,
        data: Some(data),
        guild_id: Some(GUILD.into()),
        channel_id: Some(CHANNEL.into()),
        token: "token".into(),
        message: Some(MessageRef {
            id: "panel-message".into(),
            channel_id: CHANNEL.into(),
        }),
    }
}

pub(crate) fn command(name: &str, options: Vec<CommandOption>) -> Interaction {
    interaction(
        InteractionKind::Command,
        InteractionData {
            name: Some(name.into()),
            options,
            ..InteractionData::default()
        },
    )
}

pub(crate) fn autocomplete(name: &str, options: Vec<CommandOption>) -> Interaction {
    interaction(
        InteractionKind::Autocomplete,
        InteractionData {
            name: Some(name.into()),
            options,
            ..InteractionData::default()
        },
    )
}

pub(crate) fn component(custom_id: &str, values: &[&str]) -> Interaction {
    interaction(
        InteractionKind::Component,
        InteractionData {
            custom_id: Some(custom_id.into()),
            values: values.iter().map(|v| v.to_string()).collect(),
            ..InteractionData::default()
        },
    )
}

pub(crate) fn modal(custom_id: &str, inputs: &[(&str, &str)]) -> Interaction {
    interaction(
        InteractionKind::ModalSubmit,
        InteractionData {
            custom_id: Some(custom_id.into()),
            components: inputs
                .iter()
                .map(|(id, value)| Component::input_row(TextInput::submitted(*id, *value)))
                .collect(),
            ..InteractionData::default()
        },
    )
}

/// Every custom id found in a component tree.
pub(crate) fn custom_ids(components: &[Component]) -> Vec<String> {
    let mut ids = Vec::new();
    for component in components {
        match component {
            Component::ActionRow(children) => ids.extend(custom_ids(children)),
            Component::Button(button) => ids.push(button.custom_id.clone()),
            Component::SelectMenu(menu) => ids.push(menu.custom_id.clone()),
            Component::TextInput(input) => ids.push(input.custom_id.clone()),
            Component::Other(_) => {}
        }
    }
    ids
}

pub(crate) fn choice_values(response: &InteractionResponse) -> Vec<Value> {
    response
        .data
        .as_ref()
        .and_then(|d| d.choices.as_ref())
        .map(|choices| choices.iter().map(|c| c.value.clone()).collect())
        .unwrap_or_default()
}
