//! Validation for configuration entities.
//!
//! This module provides:
//! - `Violation` / `ValidationErrors` - every problem found in one input
//! - `ConfigIndex` - id and name lookups the validators check references against
//! - `CustomJson` - the validated opaque JSON object attached to a model
//! - Pure validators for providers, models and composite models

mod index;
mod json;
mod rules;

use std::fmt;

use serde::Serialize;

pub use index::ConfigIndex;
pub use json::{CustomJson, CustomJsonError};
pub use rules::{validate_composite, validate_model, validate_provider};

/// Category of a single validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required field is missing or blank.
    Required,
    /// A name or id already taken within its scope.
    Duplicate,
    /// Not a member of the allowed set, or the wrong shape/type.
    InvalidValue,
    /// A reference to an entity that does not exist.
    UnknownReference,
    /// A reference to an entity of the wrong kind (e.g. a general model used as reasoner).
    WrongReferenceType,
    /// A numeric value outside its permitted range.
    OutOfRange,
    /// Input that could not be parsed at all.
    Malformed,
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Path of the offending field, e.g. `providers[2].provider_name`.
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The complete set of violations found while validating one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a single violation.
    pub fn single(
        field: impl Into<String>,
        kind: ViolationKind,
        message: impl Into<String>,
    ) -> Self {
        let mut errors = Self::new();
        errors.push(field, kind, message);
        errors
    }

    pub fn push(
        &mut self,
        field: impl Into<String>,
        kind: ViolationKind,
        message: impl Into<String>,
    ) {
        self.violations.push(Violation {
            field: field.into(),
            kind,
            message: message.into(),
        });
    }

    /// Merge another set, prefixing each field path with `prefix.`.
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        self.violations
            .extend(other.violations.into_iter().map(|mut v| {
                v.field = format!("{prefix}.{}", v.field);
                v
            }));
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.violations.extend(other.violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Whether any violation was reported for exactly this field path.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// Whether every violation is of the given kind.
    pub fn all_of_kind(&self, kind: ViolationKind) -> bool {
        !self.violations.is_empty() && self.violations.iter().all(|v| v.kind == kind)
    }

    /// `Ok(value)` when nothing was reported, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.len() {
            0 => write!(f, "no validation errors"),
            1 => write!(f, "{}", self.violations[0]),
            n => {
                write!(f, "{n} validation errors: ")?;
                for (i, v) in self.violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

/// Trimmed value of a required text field, or a `Required` violation.
pub(crate) fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, ViolationKind::Required, format!("{field} is required"));
        None
    } else {
        Some(trimmed.to_string())
    }
}
