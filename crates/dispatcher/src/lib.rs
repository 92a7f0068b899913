pub mod command;
pub mod error;
pub mod marshal;
pub mod registry;
pub mod session;

pub use command::{
    Autocomplete, Capabilities, Command, CommandResult, MessageComponent, ModalSubmit,
};
pub use error::{Capability, CommandError, DispatchError, RegistryError, SessionError};
pub use marshal::{unmarshal, unmarshal_components, unmarshal_options, MarshalError, Source};
pub use registry::{Dispatcher, SyncReport};
pub use session::{respond_error, Session, SessionResult};
