use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use shared::{
    custom_id,
    domain::{ChannelId, CommandId},
    protocol::{
        CallbackKind, CommandOption, InteractionData, MessageEdit, MessageRef, RegisteredCommand,
        EPHEMERAL,
    },
};

use super::*;
use crate::{
    command::{Autocomplete, CommandResult, MessageComponent, ModalSubmit},
    error::CommandError,
    session::SessionResult,
};

#[derive(Default)]
struct RecordingSession {
    responses: Mutex<Vec<InteractionResponse>>,
    edits: Mutex<Vec<MessageEdit>>,
    published: Mutex<Vec<RegisteredCommand>>,
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_create: Option<&'static str>,
}

impl RecordingSession {
    fn responses(&self) -> Vec<InteractionResponse> {
        self.responses.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Session for RecordingSession {
    async fn respond(&self, _: &Interaction, response: InteractionResponse) -> SessionResult<()> {
        self.responses.lock().expect("lock").push(response);
        Ok(())
    }

    async fn has_response(&self, _: &Interaction) -> bool {
        !self.responses.lock().expect("lock").is_empty()
    }

    async fn edit_response(&self, _: &Interaction, edit: MessageEdit) -> SessionResult<()> {
        self.edits.lock().expect("lock").push(edit);
        Ok(())
    }

    async fn delete_response(&self, _: &Interaction) -> SessionResult<()> {
        Ok(())
    }

    async fn send_message(&self, channel: &ChannelId, _: MessageEdit) -> SessionResult<MessageRef> {
        Ok(MessageRef {
            id: "m-1".into(),
            channel_id: channel.clone(),
        })
    }

    async fn edit_message(&self, _: &MessageRef, _: MessageEdit) -> SessionResult<()> {
        Ok(())
    }

    async fn delete_message(&self, _: &MessageRef) -> SessionResult<()> {
        Ok(())
    }

    async fn list_commands(&self, _: &GuildId) -> SessionResult<Vec<RegisteredCommand>> {
        Ok(self.published.lock().expect("lock").clone())
    }

    async fn create_command(
        &self,
        _: &GuildId,
        definition: &CommandDefinition,
    ) -> SessionResult<RegisteredCommand> {
        if self.fail_create == Some(definition.name.as_str()) {
            return Err(SessionError::Status(400));
        }
        self.created.lock().expect("lock").push(definition.name.clone());
        Ok(RegisteredCommand {
            id: CommandId(format!("id-{}", definition.name)),
            name: definition.name.clone(),
            description: definition.description.clone(),
        })
    }

    async fn delete_command(&self, _: &GuildId, id: &CommandId) -> SessionResult<()> {
        self.deleted.lock().expect("lock").push(id.to_string());
        Ok(())
    }
}

/// Handles `/ping` and the `ping#...` component namespace.
#[derive(Default)]
struct PingCommand {
    commands: AtomicUsize,
    components: AtomicUsize,
    completions: AtomicUsize,
    fail_with: Option<&'static str>,
}

#[async_trait]
impl Command for PingCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Answers with pong")
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        self.commands.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_with {
            session.respond_deferred(interaction, true).await?;
            return Err(CommandError::rejected("ping", message));
        }
        session.respond_ephemeral(interaction, "pong").await?;
        Ok(())
    }

    fn can_handle(&self, custom_id: &str) -> bool {
        custom_id::matches(custom_id, "ping")
    }

    fn autocomplete(&self) -> Option<&dyn Autocomplete> {
        Some(self)
    }

    fn message_component(&self) -> Option<&dyn MessageComponent> {
        Some(self)
    }
}

#[async_trait]
impl Autocomplete for PingCommand {
    async fn on_autocomplete(&self, _: &dyn Session, _: &Interaction) -> CommandResult {
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MessageComponent for PingCommand {
    async fn on_message_component(&self, _: &dyn Session, _: &Interaction) -> CommandResult {
        self.components.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Claims `echo#...` but only for modal submissions.
#[derive(Default)]
struct EchoCommand {
    modals: AtomicUsize,
}

#[async_trait]
impl Command for EchoCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Echoes")
    }

    async fn on_command(&self, _: &dyn Session, _: &Interaction) -> CommandResult {
        Ok(())
    }

    fn can_handle(&self, custom_id: &str) -> bool {
        custom_id::matches(custom_id, "echo")
    }

    fn modal_submit(&self) -> Option<&dyn ModalSubmit> {
        Some(self)
    }
}

#[async_trait]
impl ModalSubmit for EchoCommand {
    async fn on_modal_submit(&self, _: &dyn Session, _: &Interaction) -> CommandResult {
        self.modals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn interaction(kind: InteractionKind, data: InteractionData) -> Interaction {
    Interaction {
        id: "i-1".into(),
        application_id: "app".into(),
        kind,
        data: Some(data),
        guild_id: Some("guild".into()),
        channel_id: Some("chan".into()),
        token: "token".into(),
        message: None,
    }
}

fn command(name: &str) -> Interaction {
    interaction(
        InteractionKind::Command,
        InteractionData {
            name: Some(name.into()),
            ..InteractionData::default()
        },
    )
}

fn component(kind: InteractionKind, custom_id: &str) -> Interaction {
    interaction(
        kind,
        InteractionData {
            custom_id: Some(custom_id.into()),
            ..InteractionData::default()
        },
    )
}

struct Fixture {
    session: Arc<RecordingSession>,
    ping: Arc<PingCommand>,
    echo: Arc<EchoCommand>,
    dispatcher: Dispatcher,
}

fn fixture_with(session: RecordingSession, ping: PingCommand) -> Fixture {
    let session = Arc::new(session);
    let ping = Arc::new(ping);
    let echo = Arc::new(EchoCommand::default());
    let mut dispatcher = Dispatcher::new("guild".into(), session.clone());
    dispatcher.register("ping", ping.clone()).expect("register ping");
    dispatcher.register("echo", echo.clone()).expect("register echo");
    Fixture {
        session,
        ping,
        echo,
        dispatcher,
    }
}

fn fixture() -> Fixture {
    fixture_with(RecordingSession::default(), PingCommand::default())
}

fn ephemeral_content(response: &InteractionResponse) -> Option<&str> {
    let data = response.data.as_ref()?;
    assert_eq!(data.flags, Some(EPHEMERAL));
    data.content.as_deref()
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut f = fixture();
    let error = f
        .dispatcher
        .register("ping", Arc::new(PingCommand::default()))
        .expect_err("duplicate");
    assert_eq!(error, RegistryError::Duplicate("ping".into()));
    assert_eq!(f.dispatcher.definitions().len(), 2);
}

#[test]
fn capabilities_follow_accessors() {
    let f = fixture();
    let caps = f.ping.capabilities();
    assert!(caps.autocomplete && caps.message_component && !caps.modal_submit);
    let caps = f.echo.capabilities();
    assert!(!caps.autocomplete && !caps.message_component && caps.modal_submit);
}

#[tokio::test]
async fn routes_command_by_name() {
    let f = fixture();
    f.dispatcher.dispatch(&command("ping")).await.expect("dispatch");
    assert_eq!(f.ping.commands.load(Ordering::SeqCst), 1);
    let responses = f.session.responses();
    assert_eq!(ephemeral_content(&responses[0]), Some("pong"));
}

#[tokio::test]
async fn unknown_command_reports_error_to_user() {
    let f = fixture();
    let error = f
        .dispatcher
        .dispatch(&command("missing"))
        .await
        .expect_err("unknown");
    assert!(matches!(error, DispatchError::UnknownCommand(ref name) if name == "missing"));

    let responses = f.session.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].kind, CallbackKind::ChannelMessage);
    assert_eq!(
        ephemeral_content(&responses[0]),
        Some("Command does not exist: missing")
    );
    assert_eq!(f.ping.commands.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn foreign_guild_is_rejected_before_routing() {
    let f = fixture();
    let mut event = command("ping");
    event.guild_id = Some("other".into());
    let error = f.dispatcher.dispatch(&event).await.expect_err("not available");
    assert!(matches!(error, DispatchError::NotAvailable));
    assert_eq!(f.ping.commands.load(Ordering::SeqCst), 0);
    assert_eq!(
        ephemeral_content(&f.session.responses()[0]),
        Some("The command is not available for your discord server.")
    );
}

#[tokio::test]
async fn autocomplete_requires_capability() {
    let f = fixture();
    let mut event = command("ping");
    event.kind = InteractionKind::Autocomplete;
    event.data.as_mut().expect("data").options = vec![CommandOption::string("q", "p").focused()];
    f.dispatcher.dispatch(&event).await.expect("ping autocompletes");
    assert_eq!(f.ping.completions.load(Ordering::SeqCst), 1);

    let mut event = command("echo");
    event.kind = InteractionKind::Autocomplete;
    let error = f.dispatcher.dispatch(&event).await.expect_err("echo cannot");
    assert!(matches!(
        error,
        DispatchError::CapabilityMissing {
            capability: Capability::Autocomplete,
            ..
        }
    ));
}

#[tokio::test]
async fn components_route_by_custom_id_prefix() {
    let f = fixture();
    let id = custom_id::join(["ping", "again", "42"]).expect("id");
    f.dispatcher
        .dispatch(&component(InteractionKind::Component, &id))
        .await
        .expect("dispatch");
    assert_eq!(f.ping.components.load(Ordering::SeqCst), 1);

    f.dispatcher
        .dispatch(&component(InteractionKind::ModalSubmit, "echo#confirm"))
        .await
        .expect("modal");
    assert_eq!(f.echo.modals.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unclaimed_custom_id_has_no_handler() {
    let f = fixture();
    let error = f
        .dispatcher
        .dispatch(&component(InteractionKind::Component, "pingpong#x"))
        .await
        .expect_err("no handler");
    assert!(matches!(error, DispatchError::NoHandler(ref id) if id == "pingpong#x"));
    assert_eq!(f.ping.components.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn claimed_id_without_capability_is_reported() {
    let f = fixture();
    let error = f
        .dispatcher
        .dispatch(&component(InteractionKind::ModalSubmit, "ping#x"))
        .await
        .expect_err("ping has no modals");
    assert!(matches!(
        error,
        DispatchError::CapabilityMissing {
            capability: Capability::ModalSubmit,
            ..
        }
    ));
}

#[tokio::test]
async fn handler_error_edits_existing_response() {
    let f = fixture_with(
        RecordingSession::default(),
        PingCommand {
            fail_with: Some("Server is gone."),
            ..PingCommand::default()
        },
    );
    let error = f.dispatcher.dispatch(&command("ping")).await.expect_err("fails");
    assert_eq!(error.op(), "ping");

    assert_eq!(f.session.responses().len(), 1, "only the deferral was sent");
    let edits = f.session.edits.lock().expect("lock").clone();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].content.as_deref(), Some("Server is gone."));
    assert_eq!(edits[0].components, Some(Vec::new()));
}

#[tokio::test]
async fn unknown_interaction_type_is_reported_to_user() {
    let f = fixture();
    let mut event = command("ping");
    event.kind = InteractionKind::Unknown(42);
    let error = f.dispatcher.dispatch(&event).await.expect_err("unsupported");
    assert!(matches!(
        error,
        DispatchError::UnsupportedInteraction(InteractionKind::Unknown(42))
    ));

    let responses = f.session.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(
        ephemeral_content(&responses[0]),
        Some("unhandled interaction type: unknown (42)")
    );
    assert_eq!(f.ping.commands.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let f = fixture();
    let mut event = command("ping");
    event.kind = InteractionKind::Ping;
    event.guild_id = None;
    f.dispatcher.dispatch(&event).await.expect("pong");
    assert_eq!(f.session.responses(), vec![InteractionResponse::pong()]);
}

#[tokio::test]
async fn synchronize_creates_missing_and_deletes_stale() {
    let session = RecordingSession {
        published: Mutex::new(vec![
            RegisteredCommand {
                id: "p-1".into(),
                name: "ping".into(),
                description: "old description".into(),
            },
            RegisteredCommand {
                id: "p-2".into(),
                name: "retired".into(),
                description: String::new(),
            },
        ]),
        ..RecordingSession::default()
    };
    let f = fixture_with(session, PingCommand::default());

    let report = f.dispatcher.synchronize().await.expect("sync");
    assert_eq!(
        report,
        SyncReport {
            created: vec!["echo".into()],
            deleted: vec!["retired".into()],
        }
    );
    assert_eq!(*f.session.deleted.lock().expect("lock"), vec!["p-2".to_string()]);
}

#[tokio::test]
async fn synchronize_skips_failed_creations() {
    let session = RecordingSession {
        fail_create: Some("echo"),
        ..RecordingSession::default()
    };
    let f = fixture_with(session, PingCommand::default());
    let report = f.dispatcher.synchronize().await.expect("sync");
    assert_eq!(report.created, vec!["ping".to_string()]);
    assert!(report.deleted.is_empty());
}
