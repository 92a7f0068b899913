use async_trait::async_trait;
use dispatcher::{
    unmarshal_options, Autocomplete, Command, CommandError, CommandResult, Session,
};
use serde::Deserialize;
use shared::{
    domain::{BroadcastMessage, Template},
    protocol::{CommandDefinition, Interaction, MessageEdit, OptionDefinition, OptionType},
};
use storage::EntityStore;

use super::{
    helper::{focused_text, template_choices, ResultExt},
    Deps,
};

#[derive(Deserialize)]
struct AddBroadcastRequest {
    template: String,
    time: i64,
    message: String,
}

pub(crate) struct AddBroadcastCommand {
    templates: EntityStore<Template>,
}

impl AddBroadcastCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            templates: deps.templates.clone(),
        }
    }
}

#[async_trait]
impl Command for AddBroadcastCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Adds a broadcast message to a template")
            .option(
                OptionDefinition::new(
                    "template",
                    "The ID of the template where to add the message",
                    OptionType::String,
                )
                .required()
                .autocomplete(),
            )
            .option(
                OptionDefinition::new(
                    "time",
                    "The time after the last message when this message should be send",
                    OptionType::Integer,
                )
                .required()
                .range(1, 999),
            )
            .option(
                OptionDefinition::new("message", "The message to send", OptionType::String)
                    .required()
                    .length(1, 255),
            )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let request: AddBroadcastRequest = unmarshal_options(interaction.options())?;

        let broadcast = BroadcastMessage {
            time: request.time,
            message: request.message,
        };
        self.templates
            .update(&request.template, |template| {
                template.broadcast_message.push(broadcast)
            })
            .await
            .or_fail(
                "save-template",
                "There was an error saving the template. Please try again.",
            )?
            .ok_or_else(|| CommandError::not_found(format!("template with ID {}", request.template)))?;

        session
            .edit_response(
                interaction,
                MessageEdit::content("The message was added to the template."),
            )
            .await?;
        Ok(())
    }

    fn autocomplete(&self) -> Option<&dyn Autocomplete> {
        Some(self)
    }
}

#[async_trait]
impl Autocomplete for AddBroadcastCommand {
    async fn on_autocomplete(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let choices = template_choices(&self.templates, focused_text(interaction)).await?;
        session.respond_choices(interaction, choices).await?;
        Ok(())
    }
}
