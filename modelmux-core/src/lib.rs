//! modelmux Core Library
//!
//! This crate provides the configuration core for modelmux, a router that
//! fans chat requests out to multiple LLM providers. It includes:
//!
//! - Provider, model and composite model registries
//! - Typed system settings (router key, log level, connection pool, proxy)
//! - Validation that reports every violation in one pass
//! - An integrity coordinator that serializes all writes and guards
//!   cross-entity references
//! - Whole-configuration export and import as one JSON document
//! - Database layer (SQLite) with migrations

pub mod composites;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod hooks;
pub mod models;
pub mod providers;
pub mod validation;

// Re-exports for convenience
pub use db::Database;
pub use error::{ConfigError, EntityKind};

// Re-export the coordinator and its document types
pub use coordinator::{ConfigDocument, ConfigSnapshot, ImportSummary, IntegrityCoordinator};

// Re-export collaborators
pub use hooks::{
    IdGenerator, InvalidationReason, NoopInvalidator, SessionInvalidator, UuidGenerator,
};

// Re-export entities
pub use composites::{CompositeDraft, CompositeModel};
pub use models::{Model, ModelDraft, ModelFormat, ModelType, ValidModels};
pub use providers::{Provider, ProviderDraft, ProviderFormat};

// Re-export settings
pub use config::{
    LogLevel, SettingEntry, SettingKey, SettingType, SettingValue, SettingsChange, SystemSettings,
};

// Re-export validation
pub use validation::{CustomJson, ValidationErrors, Violation, ViolationKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn exports_are_accessible() {
        fn _check_types(
            _db: &Database,
            _coordinator: &IntegrityCoordinator,
            _provider: &Provider,
            _model: &Model,
            _composite: &CompositeModel,
            _settings: &SystemSettings,
            _snapshot: &ConfigSnapshot,
            _errors: &ValidationErrors,
        ) {
        }
    }

    #[test]
    fn coordinator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IntegrityCoordinator>();
    }
}
