use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric tolerance shared by answer comparison, state assertions, and the
/// report-as-integer rule. Lives here and nowhere else.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// A variable binding produced while executing a trace. Most bindings are
/// numeric; structured values carry opaque results from domain steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

pub type State = BTreeMap<String, Value>;

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Report a float as a machine integer when it sits within `epsilon` of a
    /// whole number. Keeps equality checks against integer answers predictable.
    pub fn rounded_to_int(self, epsilon: f64) -> Value {
        match self {
            Value::Float(f)
                if (f - f.round()).abs() < epsilon && f.round().abs() < i64::MAX as f64 =>
            {
                Value::Int(f.round() as i64)
            }
            other => other,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            other => match serde_json::to_string(other) {
                Ok(json) => write!(f, "{json}"),
                Err(_) => write!(f, "{other:?}"),
            },
        }
    }
}
