use std::fmt;

use shared::{error::ApiError, protocol::InteractionKind};
use thiserror::Error;

use crate::marshal::MarshalError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("platform rejected the request: {0}")]
    Api(#[from] ApiError),
    #[error("platform answered with status {0}")]
    Status(u16),
    #[error("request to the platform failed")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
    pub fn transport(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(error))
    }
}

/// Error returned by a command handler.
///
/// `op` is a short tag naming the step that failed; it ends up in the log line,
/// while the message is what the user gets to read.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    #[error("{op}: {message}")]
    Failed {
        op: &'static str,
        message: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{op}: {message}")]
    Rejected { op: &'static str, message: String },
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CommandError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn failed(
        op: &'static str,
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Failed {
            op,
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn rejected(op: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            op,
            message: message.into(),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "lookup",
            Self::Marshal(_) => "unmarshal",
            Self::Failed { op, .. } | Self::Rejected { op, .. } => op,
            Self::Session(_) => "session",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("The {what} could not be found."),
            Self::Marshal(error) => format!("The submitted data could not be read: {error}"),
            Self::Failed { message, .. } | Self::Rejected { message, .. } => message.clone(),
            Self::Session(_) => "Discord did not accept the response. Please try again.".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Autocomplete,
    MessageComponent,
    ModalSubmit,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Autocomplete => "autocomplete",
            Self::MessageComponent => "message components",
            Self::ModalSubmit => "modal submissions",
        })
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("The command is not available for your discord server.")]
    NotAvailable,
    #[error("Command does not exist: {0}")]
    UnknownCommand(String),
    #[error("command {command} does not support {capability}")]
    CapabilityMissing {
        command: String,
        capability: Capability,
    },
    #[error("no command handles {0}")]
    NoHandler(String),
    #[error("unhandled interaction type: {0}")]
    UnsupportedInteraction(InteractionKind),
    #[error("interaction carries no {0}")]
    MalformedInteraction(&'static str),
    #[error(transparent)]
    Handler(#[from] CommandError),
}

impl DispatchError {
    pub fn op(&self) -> &'static str {
        match self {
            Self::NotAvailable => "guild-check",
            Self::UnknownCommand(_)
            | Self::CapabilityMissing { .. }
            | Self::NoHandler(_)
            | Self::UnsupportedInteraction(_)
            | Self::MalformedInteraction(_) => "route",
            Self::Handler(error) => error.op(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Handler(error) => error.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a command named {0} is already registered")]
    Duplicate(String),
}
