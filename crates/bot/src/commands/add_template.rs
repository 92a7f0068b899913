use async_trait::async_trait;
use dispatcher::{unmarshal_options, Command, CommandResult, Session};
use serde::Deserialize;
use shared::{
    domain::Template,
    protocol::{CommandDefinition, Interaction, MessageEdit, OptionDefinition, OptionType},
};
use storage::EntityStore;
use tracing::info;

use super::{helper::ResultExt, Deps};

#[derive(Deserialize)]
struct AddTemplateRequest {
    name: String,
}

pub(crate) struct AddTemplateCommand {
    templates: EntityStore<Template>,
}

impl AddTemplateCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            templates: deps.templates.clone(),
        }
    }
}

#[async_trait]
impl Command for AddTemplateCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Adds a new template to be used when configuring a server")
            .option(
                OptionDefinition::new("name", "A custom name for the template", OptionType::String)
                    .required()
                    .length(1, 255),
            )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let request: AddTemplateRequest = unmarshal_options(interaction.options())?;

        let template = Template::new(request.name);
        self.templates.save(&template).await.or_fail(
            "save-template",
            "There was an error saving the template. Please try again.",
        )?;
        info!(template_id = %template.id, name = %template.name, "template added");

        session
            .edit_response(
                interaction,
                MessageEdit::content(format!(
                    "The template with the name **{}** was added with ID {}.",
                    template.name, template.id
                )),
            )
            .await?;
        Ok(())
    }
}
