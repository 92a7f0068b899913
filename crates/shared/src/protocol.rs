use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ApplicationId, ChannelId, CommandId, GuildId, InteractionId, MessageId};

/// Message flag hiding a response from everyone but the invoking user.
pub const EPHEMERAL: u64 = 1 << 6;

macro_rules! wire_enum {
    ($name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($variant),+
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} {other}", stringify!($name))),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value),+
                }
            }
        }
    };
}

/// Interaction type. Types newer than this model decode as `Unknown` so the
/// dispatcher can still answer them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionKind {
    Ping,
    Command,
    Component,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl From<u8> for InteractionKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::Command,
            3 => Self::Component,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

impl From<InteractionKind> for u8 {
    fn from(value: InteractionKind) -> Self {
        match value {
            InteractionKind::Ping => 1,
            InteractionKind::Command => 2,
            InteractionKind::Component => 3,
            InteractionKind::Autocomplete => 4,
            InteractionKind::ModalSubmit => 5,
            InteractionKind::Unknown(other) => other,
        }
    }
}

wire_enum!(OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
});

wire_enum!(ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
});

wire_enum!(TextInputStyle {
    Short = 1,
    Paragraph = 2,
});

wire_enum!(CallbackKind {
    Pong = 1,
    ChannelMessage = 4,
    DeferredChannelMessage = 5,
    DeferredUpdateMessage = 6,
    UpdateMessage = 7,
    AutocompleteResult = 8,
    Modal = 9,
});

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "ping",
            Self::Command => "application command",
            Self::Component => "message component",
            Self::Autocomplete => "autocomplete",
            Self::ModalSubmit => "modal submit",
            Self::Unknown(other) => return write!(f, "unknown ({other})"),
        };
        f.write_str(name)
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SubCommand => "SubCommand",
            Self::SubCommandGroup => "SubCommandGroup",
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::User => "User",
            Self::Channel => "Channel",
            Self::Role => "Role",
            Self::Mentionable => "Mentionable",
            Self::Number => "Number",
            Self::Attachment => "Attachment",
        };
        f.write_str(name)
    }
}

impl OptionType {
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            Self::String | Self::User | Self::Channel | Self::Role | Self::Mentionable
        )
    }

    pub fn is_integer_like(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }
}

/// One inbound user action delivered by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub application_id: ApplicationId,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<GuildId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CommandId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl Interaction {
    pub fn command_name(&self) -> Option<&str> {
        match self.kind {
            InteractionKind::Command | InteractionKind::Autocomplete => {
                self.data.as_ref()?.name.as_deref()
            }
            _ => None,
        }
    }

    pub fn component_id(&self) -> Option<&str> {
        match self.kind {
            InteractionKind::Component => self.data.as_ref()?.custom_id.as_deref(),
            _ => None,
        }
    }

    pub fn modal_id(&self) -> Option<&str> {
        match self.kind {
            InteractionKind::ModalSubmit => self.data.as_ref()?.custom_id.as_deref(),
            _ => None,
        }
    }

    pub fn options(&self) -> &[CommandOption] {
        self.data.as_ref().map_or(&[], |d| d.options.as_slice())
    }

    pub fn components(&self) -> &[Component] {
        self.data.as_ref().map_or(&[], |d| d.components.as_slice())
    }

    /// Values picked in a select menu.
    pub fn values(&self) -> &[String] {
        self.data.as_ref().map_or(&[], |d| d.values.as_slice())
    }

    /// Name of the option the user is typing into during autocomplete.
    pub fn focused_option(&self) -> Option<&str> {
        self.options()
            .iter()
            .find(|o| o.focused)
            .map(|o| o.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub focused: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    pub fn new(name: impl Into<String>, kind: OptionType, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: Some(value.into()),
            focused: false,
            options: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, OptionType::String, value.into())
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, OptionType::Integer, value)
    }

    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, OptionType::Boolean, value)
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: MessageId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawComponent", into = "RawComponent")]
pub enum Component {
    ActionRow(Vec<Component>),
    Button(Button),
    SelectMenu(SelectMenu),
    TextInput(TextInput),
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub style: ButtonStyle,
    pub label: Option<String>,
    pub emoji: Option<Emoji>,
    pub custom_id: String,
    pub disabled: bool,
}

impl Button {
    pub fn new(style: ButtonStyle, label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self {
            style,
            label: Some(label.into()),
            emoji: None,
            custom_id: custom_id.into(),
            disabled: false,
        }
    }

    pub fn icon(style: ButtonStyle, emoji: Emoji, custom_id: impl Into<String>) -> Self {
        Self {
            style,
            label: None,
            emoji: Some(emoji),
            custom_id: custom_id.into(),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub custom_id: String,
    pub style: TextInputStyle,
    pub label: String,
    pub value: String,
    pub required: bool,
    pub max_length: Option<u16>,
}

impl TextInput {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: TextInputStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            style,
            label: label.into(),
            value: String::new(),
            required: false,
            max_length: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_length(mut self, max_length: u16) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Submitted text input as it arrives inside a modal submission.
    pub fn submitted(custom_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(custom_id, "", TextInputStyle::Short).with_value(value)
    }
}

impl Component {
    pub fn row(components: impl IntoIterator<Item = Component>) -> Self {
        Self::ActionRow(components.into_iter().collect())
    }

    /// Wraps a single text input in its own row, the layout modals require.
    pub fn input_row(input: TextInput) -> Self {
        Self::ActionRow(vec![Self::TextInput(input)])
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawComponent {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emoji: Option<Emoji>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_length: Option<u16>,
}

const ACTION_ROW: u8 = 1;
const BUTTON: u8 = 2;
const STRING_SELECT: u8 = 3;
const TEXT_INPUT: u8 = 4;

impl TryFrom<RawComponent> for Component {
    type Error = String;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        Ok(match raw.kind {
            ACTION_ROW => Self::ActionRow(raw.components),
            BUTTON => Self::Button(Button {
                style: ButtonStyle::try_from(raw.style.unwrap_or(1))?,
                label: raw.label,
                emoji: raw.emoji,
                custom_id: raw.custom_id.unwrap_or_default(),
                disabled: raw.disabled.unwrap_or(false),
            }),
            STRING_SELECT => Self::SelectMenu(SelectMenu {
                custom_id: raw.custom_id.unwrap_or_default(),
                placeholder: raw.placeholder,
                options: raw.options.unwrap_or_default(),
            }),
            TEXT_INPUT => Self::TextInput(TextInput {
                custom_id: raw.custom_id.unwrap_or_default(),
                style: TextInputStyle::try_from(raw.style.unwrap_or(1))?,
                label: raw.label.unwrap_or_default(),
                value: raw.value.unwrap_or_default(),
                required: raw.required.unwrap_or(false),
                max_length: raw.max_length,
            }),
            other => Self::Other(other),
        })
    }
}

impl From<Component> for RawComponent {
    fn from(component: Component) -> Self {
        match component {
            Component::ActionRow(components) => Self {
                kind: ACTION_ROW,
                components,
                ..Self::default()
            },
            Component::Button(b) => Self {
                kind: BUTTON,
                style: Some(b.style.into()),
                label: b.label,
                emoji: b.emoji,
                custom_id: Some(b.custom_id),
                disabled: b.disabled.then_some(true),
                ..Self::default()
            },
            Component::SelectMenu(s) => Self {
                kind: STRING_SELECT,
                custom_id: Some(s.custom_id),
                placeholder: s.placeholder,
                options: Some(s.options),
                ..Self::default()
            },
            Component::TextInput(t) => Self {
                kind: TEXT_INPUT,
                custom_id: Some(t.custom_id),
                style: Some(t.style.into()),
                label: Some(t.label),
                value: (!t.value.is_empty()).then_some(t.value),
                required: Some(t.required),
                max_length: t.max_length,
                ..Self::default()
            },
            Component::Other(kind) => Self {
                kind,
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }

    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            inline: true,
            ..Self::new(name, value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: CallbackKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn new(kind: CallbackKind, data: ResponseData) -> Self {
        Self {
            kind,
            data: Some(data),
        }
    }

    pub fn pong() -> Self {
        Self {
            kind: CallbackKind::Pong,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modal {
    pub title: String,
    pub custom_id: String,
    pub components: Vec<Component>,
}

impl From<Modal> for ResponseData {
    fn from(modal: Modal) -> Self {
        Self {
            title: Some(modal.title),
            custom_id: Some(modal.custom_id),
            components: Some(modal.components),
            ..Self::default()
        }
    }
}

/// Content for a new message or replacement fields of an existing one.
/// `None` leaves a field untouched on edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Component>>,
}

impl MessageEdit {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embeds(embeds: Vec<Embed>, components: Vec<Component>) -> Self {
        Self {
            content: None,
            embeds: Some(embeds),
            components: Some(components),
        }
    }
}

impl From<MessageEdit> for ResponseData {
    fn from(edit: MessageEdit) -> Self {
        Self {
            content: edit.content,
            embeds: edit.embeds,
            components: edit.components,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
}

impl OptionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OptionType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            autocomplete: false,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn length(mut self, min: u16, max: u16) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDefinition>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }
}

/// A command as currently published on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredCommand {
    pub id: CommandId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
