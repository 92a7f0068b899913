use dispatcher::CommandError;
use serde_json::Value;
use shared::{
    custom_id,
    domain::{Server, Template},
    protocol::{Choice, Emoji, Interaction},
};
use storage::EntityStore;

/// Emoji shown on every refresh button.
pub(crate) const REFRESH_EMOJI: &str = "1283790096461594655";

pub(crate) const COLOR_DARK_GREY: u32 = 0x607d8b;
pub(crate) const COLOR_DARK_BLUE: u32 = 0x206694;
pub(crate) const COLOR_DARK_RED: u32 = 0x992d22;

/// Autocomplete answers and select menu options are capped by the platform.
pub(crate) const MAX_CHOICES: usize = 25;
const MAX_CHOICE_NAME: usize = 100;

pub(crate) trait ResultExt<T> {
    /// Turns any error into a handler failure tagged with `op`, appending the
    /// error text to `message` for the user.
    fn or_fail(self, op: &'static str, message: &str) -> Result<T, CommandError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_fail(self, op: &'static str, message: &str) -> Result<T, CommandError> {
        self.map_err(|error| {
            let error = error.into();
            CommandError::failed(op, format!("{message} Error: {error}"), error)
        })
    }
}

pub(crate) fn refresh_emoji() -> Emoji {
    Emoji {
        id: Some(REFRESH_EMOJI.into()),
        name: None,
    }
}

pub(crate) fn custom_id<const N: usize>(tokens: [&str; N]) -> Result<String, CommandError> {
    custom_id::join(tokens).or_fail(
        "custom-id",
        "There was an error creating the message components.",
    )
}

pub(crate) fn value_or_not_set(value: &str) -> &str {
    if value.is_empty() {
        "not set"
    } else {
        value
    }
}

/// The text typed so far into the focused autocomplete option.
pub(crate) fn focused_text(interaction: &Interaction) -> &str {
    interaction
        .options()
        .iter()
        .find(|o| o.focused)
        .and_then(|o| o.value.as_ref())
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Choices whose name contains `typed`, sorted by name.
pub(crate) fn choices(
    entries: impl IntoIterator<Item = (String, Value)>,
    typed: &str,
) -> Vec<Choice> {
    let mut choices = matching_choices(entries, typed);
    choices.sort_by(|a, b| a.name.cmp(&b.name));
    choices.truncate(MAX_CHOICES);
    choices
}

/// Choices whose name contains `typed`, in the order given and uncapped.
pub(crate) fn matching_choices(
    entries: impl IntoIterator<Item = (String, Value)>,
    typed: &str,
) -> Vec<Choice> {
    let typed = typed.to_lowercase();
    entries
        .into_iter()
        .filter(|(name, _)| name.to_lowercase().contains(&typed))
        .map(|(name, value)| Choice {
            name: truncate(&name, MAX_CHOICE_NAME),
            value,
        })
        .collect()
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max - 1).collect();
    truncated.push('…');
    truncated
}

pub(crate) async fn server_choices(
    servers: &EntityStore<Server>,
    typed: &str,
) -> Result<Vec<Choice>, CommandError> {
    let servers = servers
        .all()
        .await
        .or_fail("list-servers", "Could not list servers.")?;
    Ok(choices(
        servers
            .into_iter()
            .map(|s| (s.name, Value::String(s.server_id))),
        typed,
    ))
}

pub(crate) async fn template_choices(
    templates: &EntityStore<Template>,
    typed: &str,
) -> Result<Vec<Choice>, CommandError> {
    let templates = templates
        .all()
        .await
        .or_fail("list-templates", "Could not list templates.")?;
    Ok(choices(
        templates.into_iter().map(|t| (t.name, Value::String(t.id))),
        typed,
    ))
}

pub(crate) async fn find_server(
    servers: &EntityStore<Server>,
    id: &str,
) -> Result<Server, CommandError> {
    servers
        .find(id)
        .await
        .or_fail("find-server", "There was an error fetching server details.")?
        .ok_or_else(|| CommandError::not_found(format!("server with ID {id}")))
}

pub(crate) async fn find_template(
    templates: &EntityStore<Template>,
    id: &str,
) -> Result<Template, CommandError> {
    templates
        .find(id)
        .await
        .or_fail("find-template", "There was an error fetching template details.")?
        .ok_or_else(|| CommandError::not_found(format!("template with ID {id}")))
}

/// The single value picked in a select menu.
pub(crate) fn selected<'a>(interaction: &'a Interaction, op: &'static str) -> Result<&'a str, CommandError> {
    interaction
        .values()
        .first()
        .map(String::as_str)
        .ok_or_else(|| CommandError::rejected(op, "Nothing was selected."))
}
