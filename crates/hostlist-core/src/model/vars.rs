//! Typed per-host property bag

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Open-ended host properties, keyed by name
pub type Vars = BTreeMap<String, VarValue>;

/// A single property value
///
/// Variant order matters for deserialization: strings that look like
/// `YYYY-MM-DD` become [`VarValue::Date`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    /// Explicit null (`key: ~`)
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Free-form text
    Str(String),
    /// Sequence of values
    List(Vec<VarValue>),
    /// Nested mapping
    Map(BTreeMap<String, VarValue>),
}

impl VarValue {
    /// Borrow the value as text, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a date, if it is one
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            VarValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Text items of a list value, or the single text value itself
    pub fn string_items(&self) -> Vec<String> {
        match self {
            VarValue::List(items) => items.iter().map(|item| item.to_string()).collect(),
            VarValue::Null => Vec::new(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Null => write!(f, "~"),
            VarValue::Bool(b) => write!(f, "{}", b),
            VarValue::Int(i) => write!(f, "{}", i),
            VarValue::Float(x) => write!(f, "{}", x),
            VarValue::Date(d) => write!(f, "{}", d),
            VarValue::Str(s) => write!(f, "{}", s),
            VarValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            VarValue::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Str(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::Str(s)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}
