use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute map attached to every [`Point`](crate::Point).
pub type Attributes = BTreeMap<String, AttrValue>;

/// A single attribute value.
///
/// Two values are equal only when both the variant and the payload match, so
/// `Int(1)` and `Float(1.0)` are different values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Infers a value from free text: `true`/`false`, then integer, then
    /// float, falling back to text.
    pub fn parse(text: &str) -> Self {
        match text {
            "true" => return AttrValue::Bool(true),
            "false" => return AttrValue::Bool(false),
            "null" => return AttrValue::Null,
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return AttrValue::Int(i);
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => AttrValue::Float(f),
            _ => AttrValue::Text(text.to_string()),
        }
    }

    /// Whether `text`, typed in by hand, names this value: either as the
    /// value [`AttrValue::parse`] infers from it or as the literal text.
    pub fn matches_text(&self, text: &str) -> bool {
        *self == AttrValue::parse(text) || self.as_str() == Some(text)
    }

    /// Converts a JSON value. Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => AttrValue::Text(s.clone()),
            other => AttrValue::Text(other.to_string()),
        }
    }

    /// Numeric view of the value, used for averages.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => f.write_str("null"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value.into())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<&AttrValue> for AttrValue {
    fn from(value: &AttrValue) -> Self {
        value.clone()
    }
}
