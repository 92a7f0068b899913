//! Typed request structs from interaction payloads.
//!
//! Request structs derive `Deserialize`; each serde field name is the option
//! name (or text input id) it reads, and `#[serde(skip)]` fields are left
//! alone. Every other field is always produced: missing sources yield the
//! field's zero value, so optional parameters need no `#[serde(default)]`.
//!
//! ```ignore
//! #[derive(Deserialize)]
//! struct AddBroadcast {
//!     template: String,
//!     time: i64,
//!     message: String,
//! }
//! let request: AddBroadcast = unmarshal_options(interaction.options())?;
//! ```

use std::fmt;

use serde::{
    de::{self, value::StrDeserializer, DeserializeOwned, DeserializeSeed, IntoDeserializer, MapAccess, Visitor},
    forward_to_deserialize_any,
};
use serde_json::Value;
use shared::protocol::{CommandOption, Component, OptionType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("field {field} expects {field_type} but the source provides {source_type}")]
    TypeMismatch {
        field: String,
        source_type: String,
        field_type: &'static str,
    },
    #[error("field {field} has unsupported type {field_type}")]
    UnsupportedFieldType {
        field: String,
        field_type: &'static str,
    },
    #[error("field {field} cannot use value {value}")]
    InvalidValue { field: String, value: String },
    #[error("request type must be a struct")]
    NotAStruct,
    #[error("{0}")]
    Custom(String),
}

impl de::Error for MarshalError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Options of a slash command or autocomplete invocation.
    Options(&'a [CommandOption]),
    /// Action rows of a modal submission.
    Components(&'a [Component]),
}

pub fn unmarshal<T: DeserializeOwned>(source: Source<'_>) -> Result<T, MarshalError> {
    T::deserialize(Marshaller { source })
}

pub fn unmarshal_options<T: DeserializeOwned>(options: &[CommandOption]) -> Result<T, MarshalError> {
    unmarshal(Source::Options(options))
}

pub fn unmarshal_components<T: DeserializeOwned>(components: &[Component]) -> Result<T, MarshalError> {
    unmarshal(Source::Components(components))
}

struct Marshaller<'a> {
    source: Source<'a>,
}

impl<'de> de::Deserializer<'de> for Marshaller<'_> {
    type Error = MarshalError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(MarshalError::NotAStruct)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let slots = match self.source {
            Source::Options(options) => option_slots(options, fields),
            Source::Components(components) => form_slots(components, fields),
        };
        visitor.visit_map(Fields {
            slots: slots.into_iter(),
            pending: None,
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

/// Where a destination field takes its value from.
#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    Option(OptionType, &'a Value),
    /// Text input whose id equals the field name.
    Text(&'a str),
    /// Text input matched only after normalising both names.
    Loose(&'a str),
    Absent,
}

fn option_slots<'a>(
    options: &'a [CommandOption],
    fields: &'static [&'static str],
) -> Vec<(&'static str, Slot<'a>)> {
    fields
        .iter()
        .map(|&field| {
            let slot = options
                .iter()
                .find(|o| o.name == field)
                .and_then(|o| o.value.as_ref().map(|v| Slot::Option(o.kind, v)))
                .unwrap_or(Slot::Absent);
            (field, slot)
        })
        .collect()
}

fn form_slots<'a>(
    components: &'a [Component],
    fields: &'static [&'static str],
) -> Vec<(&'static str, Slot<'a>)> {
    let mut inputs = Vec::new();
    collect_inputs(components, &mut inputs);

    let mut slots: Vec<_> = fields
        .iter()
        .map(|&field| {
            let slot = inputs
                .iter()
                .find(|(id, _)| *id == field)
                .map_or(Slot::Absent, |(_, value)| Slot::Text(value));
            (field, slot)
        })
        .collect();

    for (field, slot) in slots.iter_mut() {
        if !matches!(slot, Slot::Absent) {
            continue;
        }
        let wanted = normalise(field);
        if let Some((_, value)) = inputs.iter().find(|(id, _)| normalise(id) == wanted) {
            *slot = Slot::Loose(value);
        }
    }
    slots
}

fn collect_inputs<'a>(components: &'a [Component], out: &mut Vec<(&'a str, &'a str)>) {
    for component in components {
        match component {
            Component::ActionRow(children) => collect_inputs(children, out),
            Component::TextInput(input) => out.push((&input.custom_id, &input.value)),
            _ => {}
        }
    }
}

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

struct Fields<'a> {
    slots: std::vec::IntoIter<(&'static str, Slot<'a>)>,
    pending: Option<(&'static str, Slot<'a>)>,
}

impl<'de> MapAccess<'de> for Fields<'_> {
    type Error = MarshalError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        let Some((field, slot)) = self.slots.next() else {
            return Ok(None);
        };
        self.pending = Some((field, slot));
        let key: StrDeserializer<'_, MarshalError> = field.into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        let (field, slot) = self
            .pending
            .take()
            .ok_or_else(|| MarshalError::Custom("value requested before key".into()))?;
        seed.deserialize(FieldDeserializer { field, slot })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.slots.len())
    }
}

/// 2^63; whole floats in `-I64_BOUND..I64_BOUND` convert to `i64` exactly.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

struct FieldDeserializer<'a> {
    field: &'static str,
    slot: Slot<'a>,
}

impl FieldDeserializer<'_> {
    fn unsupported(&self, field_type: &'static str) -> MarshalError {
        MarshalError::UnsupportedFieldType {
            field: self.field.to_string(),
            field_type,
        }
    }

    fn mismatch(&self, source_type: impl fmt::Display, field_type: &'static str) -> MarshalError {
        MarshalError::TypeMismatch {
            field: self.field.to_string(),
            source_type: source_type.to_string(),
            field_type,
        }
    }

    fn invalid(&self, value: impl fmt::Display) -> MarshalError {
        MarshalError::InvalidValue {
            field: self.field.to_string(),
            value: value.to_string(),
        }
    }

    fn text(&self) -> Result<String, MarshalError> {
        match self.slot {
            Slot::Option(kind, value) if kind.is_string_like() => match value {
                Value::String(s) => Ok(s.clone()),
                other => Ok(other.to_string()),
            },
            Slot::Option(kind, _) => Err(self.mismatch(kind, "string")),
            Slot::Text(text) | Slot::Loose(text) => Ok(text.to_string()),
            Slot::Absent => Ok(String::new()),
        }
    }

    fn integer(&self) -> Result<i64, MarshalError> {
        match self.slot {
            Slot::Option(kind, value) if kind.is_integer_like() => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| {
                        n.as_f64()
                            .filter(|f| f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f))
                            .map(|f| f as i64)
                    })
                    .ok_or_else(|| self.invalid(n)),
                Value::String(s) => s.trim().parse().map_err(|_| self.invalid(s)),
                other => Err(self.invalid(other)),
            },
            Slot::Option(kind, _) => Err(self.mismatch(kind, "integer")),
            Slot::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| self.mismatch(format!("text {text:?}"), "integer")),
            Slot::Loose(_) | Slot::Absent => Ok(0),
        }
    }

    fn boolean(&self) -> Result<bool, MarshalError> {
        match self.slot {
            Slot::Option(OptionType::Boolean, value) => {
                value.as_bool().ok_or_else(|| self.invalid(value))
            }
            Slot::Option(kind, _) => Err(self.mismatch(kind, "bool")),
            Slot::Text(_) => Err(self.unsupported("bool")),
            Slot::Loose(_) | Slot::Absent => Ok(false),
        }
    }
}

macro_rules! deserialize_integer {
    ($($method:ident => $ty:ty, $visit:ident),+ $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                let value = self.integer()?;
                let narrowed = <$ty>::try_from(value).map_err(|_| self.invalid(value))?;
                visitor.$visit(narrowed)
            }
        )+
    };
}

macro_rules! unsupported {
    ($($method:ident => $kind:literal),+ $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
                Err(self.unsupported($kind))
            }
        )+
    };
}

impl<'de> de::Deserializer<'de> for FieldDeserializer<'_> {
    type Error = MarshalError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("untyped value"))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_bool(self.boolean()?)
    }

    deserialize_integer!(
        deserialize_i8 => i8, visit_i8,
        deserialize_i16 => i16, visit_i16,
        deserialize_i32 => i32, visit_i32,
        deserialize_i64 => i64, visit_i64,
        deserialize_u8 => u8, visit_u8,
        deserialize_u16 => u16, visit_u16,
        deserialize_u32 => u32, visit_u32,
        deserialize_u64 => u64, visit_u64,
    );

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.text()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_string(self.text()?)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.slot {
            Slot::Absent => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("struct"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("tuple"))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("tuple"))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("unit"))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.unsupported("enum"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    unsupported! {
        deserialize_i128 => "i128",
        deserialize_u128 => "u128",
        deserialize_f32 => "float",
        deserialize_f64 => "float",
        deserialize_char => "char",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "bytes",
        deserialize_unit => "unit",
        deserialize_seq => "sequence",
        deserialize_map => "map",
        deserialize_identifier => "identifier",
    }
}

#[cfg(test)]
#[path = "tests/marshal_tests.rs"]
mod tests;
