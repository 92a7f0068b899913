use async_trait::async_trait;
use shared::protocol::{CommandDefinition, Interaction};

use crate::{error::CommandError, session::Session};

pub type CommandResult = Result<(), CommandError>;

/// A registered slash command and the follow-up interactions it owns.
///
/// Optional capabilities are exposed through the accessor methods; a command
/// that supports one returns `Some(self)` from the matching accessor.
#[async_trait]
pub trait Command: Send + Sync {
    fn definition(&self, name: &str) -> CommandDefinition;

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult;

    /// Claims component and modal custom ids for this command.
    fn can_handle(&self, _custom_id: &str) -> bool {
        false
    }

    fn autocomplete(&self) -> Option<&dyn Autocomplete> {
        None
    }

    fn message_component(&self) -> Option<&dyn MessageComponent> {
        None
    }

    fn modal_submit(&self) -> Option<&dyn ModalSubmit> {
        None
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            autocomplete: self.autocomplete().is_some(),
            message_component: self.message_component().is_some(),
            modal_submit: self.modal_submit().is_some(),
        }
    }
}

#[async_trait]
pub trait Autocomplete: Send + Sync {
    async fn on_autocomplete(&self, session: &dyn Session, interaction: &Interaction)
        -> CommandResult;
}

#[async_trait]
pub trait MessageComponent: Send + Sync {
    async fn on_message_component(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
    ) -> CommandResult;
}

#[async_trait]
pub trait ModalSubmit: Send + Sync {
    async fn on_modal_submit(&self, session: &dyn Session, interaction: &Interaction)
        -> CommandResult;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub autocomplete: bool,
    pub message_component: bool,
    pub modal_submit: bool,
}
