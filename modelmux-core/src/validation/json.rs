//! Opaque, validated JSON object attached to a model (`model_custom_json`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomJsonError {
    #[error("not valid JSON: {0}")]
    Syntax(String),
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// A JSON object whose shape has already been checked.
///
/// Only objects are representable: scalars, arrays and `null` are rejected
/// at construction, so downstream code never has to re-check the shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomJson(Map<String, Value>);

impl CustomJson {
    /// Parse JSON text that must hold an object.
    pub fn parse(text: &str) -> Result<Self, CustomJsonError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CustomJsonError::Syntax(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CustomJsonError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CustomJsonError::NotAnObject(kind_of(&other))),
        }
    }

    /// Interpret a raw form value.
    ///
    /// Absent, `null` and blank strings mean "no custom JSON". A string is
    /// parsed as JSON text; an inline object is taken as is.
    pub fn from_input(input: Option<&Value>) -> Result<Option<Self>, CustomJsonError> {
        match input {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Self::parse(text).map(Some),
            Some(other) => Self::from_value(other.clone()).map(Some),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Compact JSON text, as stored in the database.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
