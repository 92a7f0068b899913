use std::sync::Arc;

use dispatcher::{Dispatcher, RegistryError};
use remote_admin::RemoteAdmin;
use shared::domain::{Server, Template};
use storage::{ConfigFile, EntityStore};

mod add_broadcast;
mod add_server;
mod add_template;
mod create_embed;
mod credentials;
mod delete_broadcast;
mod embeds;
mod helper;
mod manage_server;
mod template;

/// Collaborators shared by every command.
#[derive(Clone)]
pub(crate) struct Deps {
    pub(crate) servers: EntityStore<Server>,
    pub(crate) templates: EntityStore<Template>,
    pub(crate) config: ConfigFile,
    pub(crate) remote: Arc<dyn RemoteAdmin>,
}

pub(crate) fn register_all(dispatcher: &mut Dispatcher, deps: &Deps) -> Result<(), RegistryError> {
    dispatcher.register(
        "create-embed",
        Arc::new(create_embed::CreateEmbedCommand::new(deps)),
    )?;
    dispatcher.register("add-server", Arc::new(add_server::AddServerCommand::new(deps)))?;
    dispatcher.register(
        "credentials",
        Arc::new(credentials::CredentialsCommand::new(deps)),
    )?;
    dispatcher.register(
        "add-template",
        Arc::new(add_template::AddTemplateCommand::new(deps)),
    )?;
    dispatcher.register("template", Arc::new(template::TemplateCommand::new(deps)))?;
    dispatcher.register(
        "add-broadcast",
        Arc::new(add_broadcast::AddBroadcastCommand::new(deps)),
    )?;
    dispatcher.register(
        "delete-broadcast",
        Arc::new(delete_broadcast::DeleteBroadcastCommand::new(deps)),
    )?;
    dispatcher.register(
        "manage-server",
        Arc::new(manage_server::ManageServerCommand::new(deps)),
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
