use async_trait::async_trait;
use dispatcher::{
    unmarshal_options, Autocomplete, Command, CommandError, CommandResult, Session,
};
use serde::Deserialize;
use serde_json::Value;
use shared::{
    domain::Template,
    protocol::{Choice, CommandDefinition, Interaction, MessageEdit, OptionDefinition, OptionType},
};
use storage::EntityStore;

use super::{
    helper::{
        find_template, focused_text, matching_choices, template_choices, ResultExt, MAX_CHOICES,
    },
    Deps,
};

#[derive(Deserialize)]
struct DeleteBroadcastRequest {
    template: String,
    message: i64,
}

#[derive(Deserialize)]
struct BroadcastLookup {
    template: Option<String>,
}

pub(crate) struct DeleteBroadcastCommand {
    templates: EntityStore<Template>,
}

impl DeleteBroadcastCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            templates: deps.templates.clone(),
        }
    }

    async fn message_choices(&self, interaction: &Interaction) -> Result<Vec<Choice>, CommandError> {
        let lookup: BroadcastLookup = unmarshal_options(interaction.options())?;
        let Some(template_id) = lookup.template.filter(|t| !t.is_empty()) else {
            return Ok(Vec::new());
        };
        let template = find_template(&self.templates, &template_id).await?;
        let mut entries = Vec::new();
        for (index, broadcast) in template.broadcast_message.iter().enumerate() {
            entries.push((
                format!("{} - {}", broadcast.time, broadcast.message),
                Value::from(index),
            ));
        }
        // Stored order, so the first messages stay reachable.
        let mut choices = matching_choices(entries, focused_text(interaction));
        choices.truncate(MAX_CHOICES);
        Ok(choices)
    }
}

#[async_trait]
impl Command for DeleteBroadcastCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Deletes a broadcast message from a template")
            .option(
                OptionDefinition::new(
                    "template",
                    "The ID of the template where to delete the message",
                    OptionType::String,
                )
                .required()
                .autocomplete(),
            )
            .option(
                OptionDefinition::new("message", "The message index to delete", OptionType::Integer)
                    .required()
                    .autocomplete(),
            )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let request: DeleteBroadcastRequest = unmarshal_options(interaction.options())?;

        let template = find_template(&self.templates, &request.template).await?;
        let index = usize::try_from(request.message)
            .ok()
            .filter(|i| *i < template.broadcast_message.len());
        let Some(index) = index else {
            return Err(out_of_range(request.message));
        };

        let removed = self
            .templates
            .update(&request.template, |template| {
                // Another removal may have shortened the list meanwhile.
                if index < template.broadcast_message.len() {
                    template.broadcast_message.remove(index);
                    true
                } else {
                    false
                }
            })
            .await
            .or_fail(
                "save-template",
                "There was an error saving the template. Please try again.",
            )?
            .ok_or_else(|| CommandError::not_found(format!("template with ID {}", request.template)))?;
        if !removed {
            return Err(out_of_range(request.message));
        }

        session
            .edit_response(
                interaction,
                MessageEdit::content("The message was deleted from the template."),
            )
            .await?;
        Ok(())
    }

    fn autocomplete(&self) -> Option<&dyn Autocomplete> {
        Some(self)
    }
}

#[async_trait]
impl Autocomplete for DeleteBroadcastCommand {
    async fn on_autocomplete(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let choices = match interaction.focused_option() {
            Some("template") => template_choices(&self.templates, focused_text(interaction)).await?,
            Some("message") => self.message_choices(interaction).await?,
            _ => Vec::new(),
        };
        session.respond_choices(interaction, choices).await?;
        Ok(())
    }
}

fn out_of_range(index: i64) -> CommandError {
    CommandError::rejected(
        "delete-broadcast",
        format!("The template has no broadcast message with index {index}."),
    )
}
