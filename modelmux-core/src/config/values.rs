//! Typed values for system settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::impl_sql_text;
use crate::error::ParseEnumError;

// =============================================================================
// Log Level
// =============================================================================

/// Router log level as stored in the `log_level` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Equivalent `tracing` filter directive.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError::new("log level", s, &Self::ALL.map(|l| l.as_str())))
    }
}

// =============================================================================
// Setting Type
// =============================================================================

/// Declared type of a setting row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Str,
    Int,
    Float,
    Bool,
}

impl SettingType {
    pub const ALL: [SettingType; 4] = [
        SettingType::Str,
        SettingType::Int,
        SettingType::Float,
        SettingType::Bool,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::Str => "str",
            SettingType::Int => "int",
            SettingType::Float => "float",
            SettingType::Bool => "bool",
        }
    }

    /// Whether a value declared as `self` may be stored in a setting of type `target`.
    pub fn fits(&self, target: SettingType) -> bool {
        *self == target || (*self == SettingType::Int && target == SettingType::Float)
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ParseEnumError::new("setting type", s, &Self::ALL.map(|t| t.as_str()))
            })
    }
}

impl_sql_text!(SettingType);

// =============================================================================
// Setting Value
// =============================================================================

/// A setting value after coercion to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    pub fn setting_type(&self) -> SettingType {
        match self {
            SettingValue::Str(_) => SettingType::Str,
            SettingValue::Int(_) => SettingType::Int,
            SettingValue::Float(_) => SettingType::Float,
            SettingValue::Bool(_) => SettingType::Bool,
        }
    }

    /// Coerce a raw JSON value to `ty`.
    ///
    /// - `str`: JSON strings only
    /// - `int`: integers or numeric strings
    /// - `float`: finite numbers or numeric strings
    /// - `bool`: booleans or `true/false/1/0/yes/no`
    pub fn coerce(ty: SettingType, raw: &Value) -> Result<Self, String> {
        match (ty, raw) {
            (SettingType::Str, Value::String(s)) => Ok(SettingValue::Str(s.clone())),
            (SettingType::Int, Value::Number(n)) => n
                .as_i64()
                .map(SettingValue::Int)
                .ok_or_else(|| format!("expected an integer, got {n}")),
            (SettingType::Float, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(SettingValue::Float)
                .ok_or_else(|| format!("expected a finite number, got {n}")),
            (SettingType::Bool, Value::Bool(b)) => Ok(SettingValue::Bool(*b)),
            (SettingType::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(SettingValue::Bool(false)),
                Some(1) => Ok(SettingValue::Bool(true)),
                _ => Err(format!("expected a boolean, got {n}")),
            },
            (SettingType::Str, other) => Err(format!("expected a string, got {other}")),
            (_, Value::String(s)) => Self::parse_text(ty, s),
            (_, other) => Err(format!("expected a {ty} value, got {other}")),
        }
    }

    /// Parse the TEXT form used in the `system_settings` table.
    pub fn parse_text(ty: SettingType, text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        match ty {
            SettingType::Str => Ok(SettingValue::Str(text.to_string())),
            SettingType::Int => trimmed
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| format!("'{text}' is not an integer")),
            SettingType::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(SettingValue::Float)
                .ok_or_else(|| format!("'{text}' is not a finite number")),
            SettingType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(SettingValue::Bool(true)),
                "false" | "0" | "no" => Ok(SettingValue::Bool(false)),
                _ => Err(format!("'{text}' is not a boolean")),
            },
        }
    }

    /// TEXT form for storage.
    pub fn to_text(&self) -> String {
        match self {
            SettingValue::Str(s) => s.clone(),
            SettingValue::Int(i) => i.to_string(),
            SettingValue::Float(f) => f.to_string(),
            SettingValue::Bool(b) => b.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Str(s) => Value::String(s.clone()),
            SettingValue::Int(i) => Value::from(*i),
            SettingValue::Float(f) => Value::from(*f),
            SettingValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// =============================================================================
// Setting Entry
// =============================================================================

/// One `{key, value, type}` item as submitted or exported.
///
/// `type` is optional on input; when given it must agree with the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub setting_type: Option<String>,
}

impl SettingEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            setting_type: None,
        }
    }

    pub fn typed(key: impl Into<String>, value: impl Into<Value>, ty: SettingType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            setting_type: Some(ty.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_level_case_insensitive() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_directive() {
        assert_eq!(LogLevel::Warning.as_directive(), "warn");
        assert_eq!(LogLevel::Critical.as_directive(), "error");
        assert_eq!(LogLevel::Debug.as_directive(), "debug");
    }

    #[test]
    fn test_setting_type_fits() {
        assert!(SettingType::Int.fits(SettingType::Float));
        assert!(!SettingType::Float.fits(SettingType::Int));
        assert!(SettingType::Str.fits(SettingType::Str));
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(
            SettingValue::coerce(SettingType::Int, &json!(10)),
            Ok(SettingValue::Int(10))
        );
        assert_eq!(
            SettingValue::coerce(SettingType::Int, &json!(" 42 ")),
            Ok(SettingValue::Int(42))
        );
        assert!(SettingValue::coerce(SettingType::Int, &json!(1.5)).is_err());
        assert!(SettingValue::coerce(SettingType::Int, &json!(true)).is_err());
    }

    #[test]
    fn test_coerce_float_widens_int() {
        assert_eq!(
            SettingValue::coerce(SettingType::Float, &json!(30)),
            Ok(SettingValue::Float(30.0))
        );
        assert_eq!(
            SettingValue::coerce(SettingType::Float, &json!("2.5")),
            Ok(SettingValue::Float(2.5))
        );
        assert!(SettingValue::coerce(SettingType::Float, &json!("inf")).is_err());
    }

    #[test]
    fn test_coerce_bool() {
        for truthy in [json!(true), json!("true"), json!("YES"), json!("1"), json!(1)] {
            assert_eq!(
                SettingValue::coerce(SettingType::Bool, &truthy),
                Ok(SettingValue::Bool(true))
            );
        }
        for falsy in [json!(false), json!("no"), json!("0"), json!(0)] {
            assert_eq!(
                SettingValue::coerce(SettingType::Bool, &falsy),
                Ok(SettingValue::Bool(false))
            );
        }
        assert!(SettingValue::coerce(SettingType::Bool, &json!("maybe")).is_err());
    }

    #[test]
    fn test_coerce_str_only_accepts_strings() {
        assert!(SettingValue::coerce(SettingType::Str, &json!(7)).is_err());
        assert_eq!(
            SettingValue::coerce(SettingType::Str, &json!("7")),
            Ok(SettingValue::Str("7".to_string()))
        );
    }

    #[test]
    fn test_text_roundtrip() {
        for value in [
            SettingValue::Str("127.0.0.1:7890".to_string()),
            SettingValue::Int(100),
            SettingValue::Float(30.0),
            SettingValue::Bool(true),
        ] {
            let parsed = SettingValue::parse_text(value.setting_type(), &value.to_text()).unwrap();
            assert_eq!(parsed, value);
        }
    }

    #[test]
    fn test_entry_type_field_renamed() {
        let entry: SettingEntry =
            serde_json::from_value(json!({"key": "log_level", "value": "DEBUG", "type": "str"}))
                .unwrap();
        assert_eq!(entry.setting_type.as_deref(), Some("str"));

        let json = serde_json::to_value(SettingEntry::typed("tcp_connector_limit", 5, SettingType::Int))
            .unwrap();
        assert_eq!(json, json!({"key": "tcp_connector_limit", "value": 5, "type": "int"}));
    }
}
