//! Scalar value type carried by nodes and frame entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A scalar node value.
///
/// Documents are free-form JSON, so values are kept as the JSON scalar they
/// were written as:
/// - `Null` for an explicit `null`
/// - `Bool`, `Int`, `Float`, `String` as given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

// ============================================================================
// Accessors
// ============================================================================

impl Value {
    /// `Null` and the empty string carry no value.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Arrays and objects are not scalars.
    pub fn from_json(json: &JsonValue) -> Option<Value> {
        match json {
            JsonValue::Null => Some(Value::Null),
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().map(Value::Float),
            },
            JsonValue::String(s) => Some(Value::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            // NaN and infinities have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::from_json(&json!(5)), Some(Value::Int(5)));
        assert_eq!(Value::from_json(&json!(2.5)), Some(Value::Float(2.5)));
        assert_eq!(Value::from_json(&json!("x")), Some(Value::from("x")));
        assert_eq!(Value::from_json(&json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(&json!([1])), None);
    }

    #[test]
    fn test_emptiness() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }

    #[test]
    fn test_untagged_serde() {
        assert_eq!(serde_json::to_string(&Value::Int(4)).unwrap(), "4");
        let v: Value = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, Value::Float(3.5));
    }
}
