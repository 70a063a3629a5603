//! Model configuration and registry.
//!
//! This module provides:
//! - `ModelType` / `ModelFormat` - Role and API format of a model
//! - `Model` / `ModelDraft` - Validated record and raw input
//! - `ModelRegistry` - Database-backed model storage

mod config;
mod registry;
mod types;

pub use config::{Model, ModelDraft, ValidModels};
pub use registry::ModelRegistry;
pub use types::{ModelFormat, ModelType};
