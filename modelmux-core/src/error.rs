//! Error types for configuration operations.

use std::fmt;

use thiserror::Error;

use crate::validation::{ValidationErrors, ViolationKind};

/// The kind of stored entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Provider,
    Model,
    CompositeModel,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Provider => write!(f, "provider"),
            EntityKind::Model => write!(f, "model"),
            EntityKind::CompositeModel => write!(f, "composite model"),
        }
    }
}

/// Errors returned by registries, the settings store and the coordinator.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        ConfigError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True for dependency conflicts and for validation failures that
    /// consist only of uniqueness violations.
    pub fn is_conflict(&self) -> bool {
        match self {
            ConfigError::Conflict(_) => true,
            ConfigError::Validation(errors) => errors.all_of_kind(ViolationKind::Duplicate),
            _ => false,
        }
    }

    /// The violations, when this is a validation failure.
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            ConfigError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

/// A string that is not one of an enum's known spellings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str, known: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: known.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ConfigError::not_found(EntityKind::CompositeModel, "c-1");
        assert_eq!(err.to_string(), "composite model not found: c-1");
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_duplicate_only_validation_is_conflict() {
        let dup = ValidationErrors::single("provider_name", ViolationKind::Duplicate, "taken");
        assert!(ConfigError::from(dup).is_conflict());

        let mut mixed = ValidationErrors::single("provider_name", ViolationKind::Duplicate, "taken");
        mixed.push("api_base_url", ViolationKind::Required, "missing");
        assert!(!ConfigError::from(mixed).is_conflict());

        assert!(ConfigError::Conflict("in use".into()).is_conflict());
    }

    #[test]
    fn test_parse_enum_error_message() {
        let err = ParseEnumError::new("model type", "chat", &["reasoner", "general"]);
        assert_eq!(
            err.to_string(),
            "unknown model type 'chat' (expected one of: reasoner, general)"
        );
    }
}
