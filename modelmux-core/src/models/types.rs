//! Core model type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::impl_sql_text;
use crate::error::ParseEnumError;

/// Role a model plays in the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Produces the reasoning/thinking part of a response
    Reasoner,
    /// Produces the final answer
    General,
}

impl ModelType {
    pub const ALL: [ModelType; 2] = [ModelType::Reasoner, ModelType::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Reasoner => "reasoner",
            ModelType::General => "general",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseEnumError::new("model type", s, &Self::ALL.map(|t| t.as_str())))
    }
}

impl_sql_text!(ModelType);

/// API format a model is addressed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Openai,
    Deepseek,
    Anthropic,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 3] = [
        ModelFormat::Openai,
        ModelFormat::Deepseek,
        ModelFormat::Anthropic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Openai => "openai",
            ModelFormat::Deepseek => "deepseek",
            ModelFormat::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ParseEnumError::new("model format", s, &Self::ALL.map(|m| m.as_str()))
            })
    }
}

impl_sql_text!(ModelFormat);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_display() {
        assert_eq!(ModelType::Reasoner.to_string(), "reasoner");
        assert_eq!(ModelType::General.to_string(), "general");
    }

    #[test]
    fn test_model_type_from_str() {
        assert_eq!("reasoner".parse::<ModelType>().unwrap(), ModelType::Reasoner);
        assert_eq!("GENERAL".parse::<ModelType>().unwrap(), ModelType::General);
        assert!("chat".parse::<ModelType>().is_err());
    }

    #[test]
    fn test_model_format_rejects_google() {
        // google is a provider format, not a model format
        assert!("google".parse::<ModelFormat>().is_err());
        assert_eq!("anthropic".parse::<ModelFormat>().unwrap(), ModelFormat::Anthropic);
    }
}
