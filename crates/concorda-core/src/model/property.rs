//! Typed property values for ontology-driven property bags.

use serde_json::Value;

use crate::ontology::PropertyType;

/// A dynamic property value, discriminated by the ontology-declared type.
///
/// Dates stay in their wire form (ISO-8601 strings); the distinct variant
/// preserves the declared type through round trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    List(Vec<String>),
    Date(String),
}

impl PropertyValue {
    /// Interpret a JSON value as the given declared type.
    ///
    /// Returns `None` when the value does not match the type, mirroring the
    /// ontology validation rules: strings and dates accept only strings,
    /// ints accept integers or whole-valued numbers, lists accept homogenous
    /// string arrays.
    pub fn from_json(kind: PropertyType, value: &Value) -> Option<Self> {
        match kind {
            PropertyType::String => value.as_str().map(|s| Self::Str(s.to_string())),
            PropertyType::Date => value.as_str().map(|s| Self::Date(s.to_string())),
            PropertyType::Int => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.trunc() == *f).map(|f| f as i64))
                    .map(Self::Int),
                _ => None,
            },
            PropertyType::StringList => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(Self::List),
                _ => None,
            },
        }
    }

    /// The wire representation of this value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(s) | Self::Date(s) => Value::String(s.clone()),
            Self::Int(n) => Value::Number((*n).into()),
            Self::List(items) => Value::Array(
                items.iter().map(|s| Value::String(s.clone())).collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Date(s) => Some(s),
            _ => None,
        }
    }
}
