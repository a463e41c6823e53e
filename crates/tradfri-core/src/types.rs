//! Wire value definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A wire object: short (numeric string) keys mapped to values
pub type WireObject = BTreeMap<String, Value>;

/// Value that can appear in a wire object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(WireObject),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&WireObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<WireObject> for Value {
    fn from(v: WireObject) -> Self {
        Value::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_numbers() {
        let int: Value = serde_json::from_str("5851").unwrap();
        assert_eq!(int, Value::Int(5851));

        let float: Value = serde_json::from_str("0.5").unwrap();
        assert_eq!(float, Value::Float(0.5));
    }

    #[test]
    fn test_nested_object() {
        let value: Value = serde_json::from_str(r#"{"9018": {"15002": {"9003": [65537, 65538]}}}"#).unwrap();
        let ids = value
            .as_object()
            .and_then(|o| o.get("9018"))
            .and_then(Value::as_object)
            .and_then(|o| o.get("15002"))
            .and_then(Value::as_object)
            .and_then(|o| o.get("9003"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(ids, &[Value::Int(65537), Value::Int(65538)]);
    }
}
