use std::{collections::BTreeMap, sync::Arc};

use shared::{
    domain::GuildId,
    protocol::{CommandDefinition, Interaction, InteractionKind, InteractionResponse},
};
use tracing::{debug, error, info, warn};

use crate::{
    command::Command,
    error::{Capability, DispatchError, RegistryError, SessionError},
    session::{respond_error, Session},
};

/// Commands created and deleted by [`Dispatcher::synchronize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
}

/// Owns the registered commands and routes interactions to them.
pub struct Dispatcher {
    guild_id: GuildId,
    session: Arc<dyn Session>,
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl Dispatcher {
    pub fn new(guild_id: GuildId, session: Arc<dyn Session>) -> Self {
        Self {
            guild_id,
            session,
            commands: BTreeMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        command: Arc<dyn Command>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.commands.insert(name, command);
        Ok(())
    }

    pub fn definitions(&self) -> Vec<CommandDefinition> {
        self.commands
            .iter()
            .map(|(name, command)| command.definition(name))
            .collect()
    }

    /// Brings the published guild commands in line with the registry.
    ///
    /// Commands are compared by name only; a published command whose options
    /// changed is left as it is.
    pub async fn synchronize(&self) -> Result<SyncReport, SessionError> {
        let published = self.session.list_commands(&self.guild_id).await?;
        let mut report = SyncReport::default();

        for command in &published {
            if self.commands.contains_key(&command.name) {
                continue;
            }
            match self.session.delete_command(&self.guild_id, &command.id).await {
                Ok(()) => report.deleted.push(command.name.clone()),
                Err(error) => {
                    error!(command = %command.name, %error, "could not delete stale command")
                }
            }
        }

        for (name, command) in &self.commands {
            if published.iter().any(|p| &p.name == name) {
                continue;
            }
            let definition = command.definition(name);
            match self.session.create_command(&self.guild_id, &definition).await {
                Ok(_) => report.created.push(name.clone()),
                Err(error) => error!(command = %name, %error, "could not create command"),
            }
        }

        info!(
            created = report.created.len(),
            deleted = report.deleted.len(),
            "commands synchronized"
        );
        Ok(report)
    }

    /// Routes one interaction and reports any failure back to the user.
    pub async fn dispatch(&self, interaction: &Interaction) -> Result<(), DispatchError> {
        let result = self.route(interaction).await;
        if let Err(error) = &result {
            error!(
                op = error.op(),
                interaction = %interaction.id,
                kind = %interaction.kind,
                %error,
                "interaction failed"
            );
            let message = error.user_message();
            if let Err(error) = respond_error(self.session.as_ref(), interaction, &message).await {
                warn!(interaction = %interaction.id, %error, "could not report failure to user");
            }
        }
        result
    }

    async fn route(&self, interaction: &Interaction) -> Result<(), DispatchError> {
        if interaction.kind == InteractionKind::Ping {
            self.session
                .respond(interaction, InteractionResponse::pong())
                .await
                .map_err(|e| DispatchError::Handler(e.into()))?;
            return Ok(());
        }

        if interaction.guild_id.as_ref() != Some(&self.guild_id) {
            return Err(DispatchError::NotAvailable);
        }

        let session = self.session.as_ref();
        match interaction.kind {
            InteractionKind::Command => {
                let (_, command) = self.lookup(interaction)?;
                command.on_command(session, interaction).await?;
            }
            InteractionKind::Autocomplete => {
                let (name, command) = self.lookup(interaction)?;
                let handler = command
                    .autocomplete()
                    .ok_or_else(|| missing(name, Capability::Autocomplete))?;
                handler.on_autocomplete(session, interaction).await?;
            }
            InteractionKind::Component => {
                let custom_id = interaction
                    .component_id()
                    .ok_or(DispatchError::MalformedInteraction("custom id"))?;
                let (name, command) = self.claimant(custom_id)?;
                let handler = command
                    .message_component()
                    .ok_or_else(|| missing(name, Capability::MessageComponent))?;
                handler.on_message_component(session, interaction).await?;
            }
            InteractionKind::ModalSubmit => {
                let custom_id = interaction
                    .modal_id()
                    .ok_or(DispatchError::MalformedInteraction("custom id"))?;
                let (name, command) = self.claimant(custom_id)?;
                let handler = command
                    .modal_submit()
                    .ok_or_else(|| missing(name, Capability::ModalSubmit))?;
                handler.on_modal_submit(session, interaction).await?;
            }
            other => return Err(DispatchError::UnsupportedInteraction(other)),
        }
        Ok(())
    }

    fn lookup(&self, interaction: &Interaction) -> Result<(&str, &dyn Command), DispatchError> {
        let name = interaction
            .command_name()
            .ok_or(DispatchError::MalformedInteraction("command name"))?;
        self.commands
            .get_key_value(name)
            .map(|(name, command)| (name.as_str(), command.as_ref()))
            .ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))
    }

    fn claimant(&self, custom_id: &str) -> Result<(&str, &dyn Command), DispatchError> {
        let claimant = self
            .commands
            .iter()
            .find(|(_, command)| command.can_handle(custom_id));
        match claimant {
            Some((name, command)) => {
                debug!(%custom_id, command = %name, "custom id claimed");
                Ok((name.as_str(), command.as_ref()))
            }
            None => Err(DispatchError::NoHandler(custom_id.to_string())),
        }
    }
}

fn missing(command: &str, capability: Capability) -> DispatchError {
    DispatchError::CapabilityMissing {
        command: command.to_string(),
        capability,
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
