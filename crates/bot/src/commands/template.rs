use async_trait::async_trait;
use dispatcher::{
    unmarshal_components, unmarshal_options, Autocomplete, Command, CommandError, CommandResult,
    MessageComponent, ModalSubmit, Session,
};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    custom_id::{matches, tail},
    domain::Template,
    protocol::{
        Button, ButtonStyle, CommandDefinition, Component, Embed, EmbedField, Interaction,
        MessageEdit, Modal, OptionDefinition, OptionType, TextInput, TextInputStyle,
    },
};
use storage::EntityStore;
use tracing::info;

use super::{
    helper::{
        custom_id, find_template, focused_text, refresh_emoji, template_choices, value_or_not_set,
        ResultExt, COLOR_DARK_GREY,
    },
    Deps,
};

const TEMPLATES_PREFIX: &str = "templates";

#[derive(Deserialize)]
struct TemplateRequest {
    template: String,
}

#[derive(Deserialize)]
struct MessagesForm {
    #[serde(rename = "welcome-message")]
    welcome_message: String,
    #[serde(rename = "server-name-template")]
    server_name_template: String,
}

/// Numbers are read leniently, anything unparsable counts as zero.
#[derive(Deserialize)]
struct ThresholdsForm {
    #[serde(rename = "team-switch-cooldown")]
    team_switch_cooldown: String,
    #[serde(rename = "auto-balance-threshold")]
    auto_balance_threshold: String,
}

impl ThresholdsForm {
    fn team_switch_cooldown(&self) -> i64 {
        self.team_switch_cooldown.trim().parse().unwrap_or(0)
    }

    fn auto_balance_threshold(&self) -> i64 {
        self.auto_balance_threshold.trim().parse().unwrap_or(0)
    }
}

#[derive(Deserialize)]
struct ProfanityForm {
    #[serde(rename = "profanity-filter")]
    profanity_filter: String,
}

impl ProfanityForm {
    fn words(&self) -> Vec<String> {
        self.profanity_filter
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub(crate) struct TemplateCommand {
    templates: EntityStore<Template>,
}

impl TemplateCommand {
    pub(crate) fn new(deps: &Deps) -> Self {
        Self {
            templates: deps.templates.clone(),
        }
    }

    async fn on_set(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        id: &str,
        modal: fn(&Template) -> Result<Modal, CommandError>,
    ) -> CommandResult {
        let template = find_template(&self.templates, id).await?;
        session.respond_modal(interaction, modal(&template)?).await?;
        Ok(())
    }

    /// Reads the submitted form into `F`, applies it and shows the updated panel.
    async fn on_confirm<F: DeserializeOwned + Send>(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
        id: &str,
        apply: impl FnOnce(&mut Template, F) + Send,
    ) -> CommandResult {
        let form: F = unmarshal_components(interaction.components())?;
        let template = self
            .templates
            .update(id, |template| {
                apply(template, form);
                template.clone()
            })
            .await
            .or_fail("save-template", "There was an error saving the template.")?
            .ok_or_else(|| CommandError::not_found(format!("template with ID {id}")))?;
        info!(template_id = %id, "template updated");
        session
            .respond_update(interaction, template_panel(&template)?)
            .await?;
        Ok(())
    }
}

fn template_panel(template: &Template) -> Result<MessageEdit, CommandError> {
    let profanities = if template.profanity_filter.is_empty() {
        "not set".to_string()
    } else {
        template.profanity_filter.join("\n")
    };
    let embed = Embed {
        title: Some(template.name.clone()),
        description: None,
        color: Some(COLOR_DARK_GREY),
        fields: vec![
            EmbedField::new("ID", template.id.clone()),
            EmbedField::inline(
                "Server Name Template",
                format!("`{}`", value_or_not_set(&template.server_name_template)),
            ),
            EmbedField::new(
                "Welcome Message",
                format!("`{}`", value_or_not_set(&template.welcome_message)),
            ),
            EmbedField::inline(
                "Autobalance Threshold",
                template.auto_balance_threshold.to_string(),
            ),
            EmbedField::inline(
                "Teamswitch cooldown",
                template.team_switch_cooldown.to_string(),
            ),
            EmbedField::new("Profanity filter", profanities),
        ],
    };

    let id = template.id.as_str();
    let buttons = Component::row([
        Component::Button(Button::new(
            ButtonStyle::Secondary,
            "Update message and Server name Template",
            custom_id([TEMPLATES_PREFIX, "set-messages", id])?,
        )),
        Component::Button(Button::new(
            ButtonStyle::Secondary,
            "Set Thresholds",
            custom_id([TEMPLATES_PREFIX, "set-thresholds", id])?,
        )),
        Component::Button(Button::new(
            ButtonStyle::Secondary,
            "Set Profanity filter",
            custom_id([TEMPLATES_PREFIX, "set-profanity-filter", id])?,
        )),
        Component::Button(Button::icon(
            ButtonStyle::Secondary,
            refresh_emoji(),
            custom_id([TEMPLATES_PREFIX, "refresh", id])?,
        )),
    ]);
    Ok(MessageEdit::embeds(vec![embed], vec![buttons]))
}

fn messages_modal(template: &Template) -> Result<Modal, CommandError> {
    Ok(Modal {
        title: "Set Messages".into(),
        custom_id: custom_id([TEMPLATES_PREFIX, "confirm-messages", template.id.as_str()])?,
        components: vec![
            Component::input_row(
                TextInput::new("welcome-message", "Welcome Message", TextInputStyle::Paragraph)
                    .with_value(template.welcome_message.clone()),
            ),
            Component::input_row(
                TextInput::new("server-name-template", "Server Name Template", TextInputStyle::Short)
                    .with_value(template.server_name_template.clone()),
            ),
        ],
    })
}

fn thresholds_modal(template: &Template) -> Result<Modal, CommandError> {
    Ok(Modal {
        title: "Set Thresholds".into(),
        custom_id: custom_id([TEMPLATES_PREFIX, "confirm-thresholds", template.id.as_str()])?,
        components: vec![
            Component::input_row(
                TextInput::new(
                    "team-switch-cooldown",
                    "Teamswitch Cooldown (seconds)",
                    TextInputStyle::Short,
                )
                .with_value(template.team_switch_cooldown.to_string())
                .max_length(3),
            ),
            Component::input_row(
                TextInput::new("auto-balance-threshold", "Autobalance Threshold", TextInputStyle::Short)
                    .with_value(template.auto_balance_threshold.to_string())
                    .max_length(2),
            ),
        ],
    })
}

fn profanity_modal(template: &Template) -> Result<Modal, CommandError> {
    Ok(Modal {
        title: "Set Profanity filter".into(),
        custom_id: custom_id([TEMPLATES_PREFIX, "confirm-profanity-filter", template.id.as_str()])?,
        components: vec![Component::input_row(
            TextInput::new("profanity-filter", "Profanity (one per line)", TextInputStyle::Paragraph)
                .with_value(template.profanity_filter.join("\n")),
        )],
    })
}

#[async_trait]
impl Command for TemplateCommand {
    fn definition(&self, name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "Manage a template").option(
            OptionDefinition::new("template", "The template ID to manage", OptionType::String)
                .required()
                .autocomplete(),
        )
    }

    async fn on_command(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        session.respond_deferred(interaction, true).await?;
        let request: TemplateRequest = unmarshal_options(interaction.options())?;
        let template = find_template(&self.templates, &request.template).await?;
        session
            .edit_response(interaction, template_panel(&template)?)
            .await?;
        Ok(())
    }

    fn can_handle(&self, custom_id: &str) -> bool {
        matches(custom_id, TEMPLATES_PREFIX)
    }

    fn autocomplete(&self) -> Option<&dyn Autocomplete> {
        Some(self)
    }

    fn message_component(&self) -> Option<&dyn MessageComponent> {
        Some(self)
    }

    fn modal_submit(&self) -> Option<&dyn ModalSubmit> {
        Some(self)
    }
}

#[async_trait]
impl Autocomplete for TemplateCommand {
    async fn on_autocomplete(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let choices = template_choices(&self.templates, focused_text(interaction)).await?;
        session.respond_choices(interaction, choices).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageComponent for TemplateCommand {
    async fn on_message_component(
        &self,
        session: &dyn Session,
        interaction: &Interaction,
    ) -> CommandResult {
        let custom = interaction.component_id().unwrap_or_default();
        match tail(custom, TEMPLATES_PREFIX).unwrap_or_default().as_slice() {
            ["refresh", id] => {
                let template = find_template(&self.templates, id).await?;
                session
                    .respond_update(interaction, template_panel(&template)?)
                    .await?;
                Ok(())
            }
            ["set-messages", id] => self.on_set(session, interaction, id, messages_modal).await,
            ["set-thresholds", id] => self.on_set(session, interaction, id, thresholds_modal).await,
            ["set-profanity-filter", id] => {
                self.on_set(session, interaction, id, profanity_modal).await
            }
            _ => Err(CommandError::rejected(
                "message-component",
                format!("Unknown action {custom}."),
            )),
        }
    }
}

#[async_trait]
impl ModalSubmit for TemplateCommand {
    async fn on_modal_submit(&self, session: &dyn Session, interaction: &Interaction) -> CommandResult {
        let custom = interaction.modal_id().unwrap_or_default();
        match tail(custom, TEMPLATES_PREFIX).unwrap_or_default().as_slice() {
            ["confirm-messages", id] => {
                self.on_confirm(session, interaction, id, |t, form: MessagesForm| {
                    t.welcome_message = form.welcome_message;
                    t.server_name_template = form.server_name_template;
                })
                .await
            }
            ["confirm-thresholds", id] => {
                self.on_confirm(session, interaction, id, |t, form: ThresholdsForm| {
                    t.team_switch_cooldown = form.team_switch_cooldown();
                    t.auto_balance_threshold = form.auto_balance_threshold();
                })
                .await
            }
            ["confirm-profanity-filter", id] => {
                self.on_confirm(session, interaction, id, |t, form: ProfanityForm| {
                    t.profanity_filter = form.words();
                })
                .await
            }
            _ => Err(CommandError::rejected(
                "modal-submit",
                format!("Unknown action {custom}."),
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/template_tests.rs"]
mod tests;
