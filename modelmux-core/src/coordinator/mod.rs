//! Single entry point for every configuration read and write.
//!
//! The coordinator owns the database behind one mutex. Each operation runs
//! entirely inside that critical section, and each write inside one
//! `BEGIN IMMEDIATE` transaction, so cross-entity checks (does a model still
//! reference this provider?) cannot race with the writes they guard.

mod transfer;


use std::path::PathBuf;

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use tracing::{info, warn};

use crate::composites::{CompositeDraft, CompositeModel, CompositeRegistry};
use crate::config::{
    SettingEntry, SettingKey, SettingValue, SettingsChange, SettingsStore, SystemSettings,
};
use crate::db::Database;
use crate::error::{ConfigError, EntityKind};
use crate::hooks::{
    IdGenerator, InvalidationReason, NoopInvalidator, SessionInvalidator, UuidGenerator,
};
use crate::models::{Model, ModelDraft, ModelRegistry, ModelType, ValidModels};
use crate::providers::{Provider, ProviderDraft, ProviderRegistry};

pub use transfer::{ConfigDocument, ConfigSnapshot, ImportSummary, FORMAT_VERSION};

/// Serializes all configuration access and enforces cross-entity integrity.
pub struct IntegrityCoordinator {
    db: Mutex<Database>,
    ids: Box<dyn IdGenerator>,
    sessions: Box<dyn SessionInvalidator>,
}

impl std::fmt::Debug for IntegrityCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityCoordinator").finish_non_exhaustive()
    }
}

impl IntegrityCoordinator {
    /// Wrap an already-migrated database.
    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            ids: Box::new(UuidGenerator),
            sessions: Box::new(NoopInvalidator),
        }
    }

    /// Open (creating if needed) and migrate the database at `path`.
    pub fn open_at(path: PathBuf) -> anyhow::Result<Self> {
        let db = Database::open_at(path)?;
        db.migrate()?;
        info!(path = %db.path().display(), "Opened configuration database");
        Ok(Self::new(db))
    }

    /// Open and migrate the database at the default location.
    pub fn open() -> anyhow::Result<Self> {
        Self::open_at(Database::default_path()?)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let db = Database::open_in_memory()?;
        db.migrate()?;
        Ok(Self::new(db))
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_session_invalidator(mut self, sessions: impl SessionInvalidator + 'static) -> Self {
        self.sessions = Box::new(sessions);
        self
    }

    /// Close the database. Consumes the coordinator.
    pub fn shutdown(self) -> Result<(), ConfigError> {
        let db = self.db.into_inner();
        let path = db.path().clone();
        db.close()?;
        info!(path = %path.display(), "Closed configuration database");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Providers
    // -------------------------------------------------------------------------

    pub fn list_providers(&self) -> Result<Vec<Provider>, ConfigError> {
        self.read(|conn| ProviderRegistry::new(conn).list())
    }

    pub fn get_valid_providers(&self) -> Result<Vec<Provider>, ConfigError> {
        self.read(|conn| ProviderRegistry::new(conn).get_valid())
    }

    pub fn get_provider(&self, id: &str) -> Result<Option<Provider>, ConfigError> {
        self.read(|conn| ProviderRegistry::new(conn).get(id))
    }

    pub fn get_provider_by_name(&self, name: &str) -> Result<Option<Provider>, ConfigError> {
        self.read(|conn| ProviderRegistry::new(conn).get_by_name(name))
    }

    pub fn save_provider(&self, draft: &ProviderDraft) -> Result<Provider, ConfigError> {
        let provider = self.write(|tx| ProviderRegistry::new(tx).save(draft, self.ids.as_ref()))?;
        info!(provider = %provider.provider_name, id = %provider.id, "Provider saved");
        Ok(provider)
    }

    /// Delete a provider that no model references.
    pub fn delete_provider(&self, id: &str) -> Result<(), ConfigError> {
        let provider = self.write(|tx| {
            let providers = ProviderRegistry::new(tx);
            let provider = providers
                .get(id)?
                .ok_or_else(|| ConfigError::not_found(EntityKind::Provider, id))?;

            let dependents = ModelRegistry::new(tx).count_by_provider(id)?;
            if dependents > 0 {
                warn!(
                    provider = %provider.provider_name,
                    dependents,
                    "Refusing to delete provider still in use"
                );
                return Err(ConfigError::Conflict(format!(
                    "provider '{}' is used by {dependents} model(s)",
                    provider.provider_name
                )));
            }

            providers.remove(id)?;
            Ok(provider)
        })?;
        info!(provider = %provider.provider_name, id = %id, "Provider deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Models
    // -------------------------------------------------------------------------

    pub fn list_models(&self) -> Result<Vec<Model>, ConfigError> {
        self.read(|conn| ModelRegistry::new(conn).list())
    }

    pub fn list_models_by_type(&self, model_type: ModelType) -> Result<Vec<Model>, ConfigError> {
        self.read(|conn| ModelRegistry::new(conn).list_by_type(model_type))
    }

    pub fn get_valid_models_grouped(&self) -> Result<ValidModels, ConfigError> {
        self.read(|conn| ModelRegistry::new(conn).get_valid_grouped_by_type())
    }

    pub fn get_model(&self, id: &str) -> Result<Option<Model>, ConfigError> {
        self.read(|conn| ModelRegistry::new(conn).get(id))
    }

    pub fn get_model_by_name(
        &self,
        model_type: ModelType,
        name: &str,
    ) -> Result<Option<Model>, ConfigError> {
        self.read(|conn| ModelRegistry::new(conn).get_by_name(model_type, name))
    }

    pub fn save_model(&self, draft: &ModelDraft) -> Result<Model, ConfigError> {
        let model = self.write(|tx| ModelRegistry::new(tx).save(draft, self.ids.as_ref()))?;
        info!(
            model = %model.model_name,
            model_type = %model.model_type,
            id = %model.id,
            "Model saved"
        );
        Ok(model)
    }

    /// Delete a model that no composite references.
    pub fn delete_model(&self, id: &str) -> Result<(), ConfigError> {
        let model = self.write(|tx| {
            let models = ModelRegistry::new(tx);
            let model = models
                .get(id)?
                .ok_or_else(|| ConfigError::not_found(EntityKind::Model, id))?;

            let dependents = CompositeRegistry::new(tx).referencing(id)?;
            if !dependents.is_empty() {
                let names: Vec<&str> = dependents.iter().map(|c| c.model_name.as_str()).collect();
                warn!(
                    model = %model.model_name,
                    composites = ?names,
                    "Refusing to delete model still in use"
                );
                return Err(ConfigError::Conflict(format!(
                    "model '{}' is used by composite model(s): {}",
                    model.model_name,
                    names.join(", ")
                )));
            }

            models.remove(id)?;
            Ok(model)
        })?;
        info!(model = %model.model_name, id = %id, "Model deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Composite Models
    // -------------------------------------------------------------------------

    pub fn list_composites(&self) -> Result<Vec<CompositeModel>, ConfigError> {
        self.read(|conn| CompositeRegistry::new(conn).list())
    }

    pub fn get_valid_composites(&self) -> Result<Vec<CompositeModel>, ConfigError> {
        self.read(|conn| CompositeRegistry::new(conn).get_valid())
    }

    pub fn get_composite(&self, id: &str) -> Result<Option<CompositeModel>, ConfigError> {
        self.read(|conn| CompositeRegistry::new(conn).get(id))
    }

    pub fn save_composite(&self, draft: &CompositeDraft) -> Result<CompositeModel, ConfigError> {
        let composite =
            self.write(|tx| CompositeRegistry::new(tx).save(draft, self.ids.as_ref()))?;
        info!(composite = %composite.model_name, id = %composite.id, "Composite model saved");
        Ok(composite)
    }

    pub fn delete_composite(&self, id: &str) -> Result<(), ConfigError> {
        self.write(|tx| {
            if CompositeRegistry::new(tx).remove(id)? {
                Ok(())
            } else {
                Err(ConfigError::not_found(EntityKind::CompositeModel, id))
            }
        })?;
        info!(id = %id, "Composite model deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    pub fn get_settings(&self) -> Result<SystemSettings, ConfigError> {
        self.read(|conn| SettingsStore::new(conn).get_all())
    }

    pub fn get_setting(&self, key: SettingKey) -> Result<SettingValue, ConfigError> {
        self.read(|conn| SettingsStore::new(conn).get(key))
    }

    /// Apply a batch of settings atomically.
    pub fn update_settings(&self, entries: &[SettingEntry]) -> Result<SettingsChange, ConfigError> {
        self.commit_settings(|store| store.update(entries))
    }

    pub fn set_log_level(&self, level: &str) -> Result<SettingsChange, ConfigError> {
        self.commit_settings(|store| store.set_log_level(level))
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<SettingsChange, ConfigError> {
        self.commit_settings(|store| store.set_api_key(api_key))
    }

    pub fn set_connection_limits(
        &self,
        limit: i64,
        per_host: i64,
        keepalive_timeout: f64,
    ) -> Result<SettingsChange, ConfigError> {
        self.commit_settings(|store| store.set_connection_limits(limit, per_host, keepalive_timeout))
    }

    fn commit_settings(
        &self,
        f: impl FnOnce(&SettingsStore<'_>) -> Result<SettingsChange, ConfigError>,
    ) -> Result<SettingsChange, ConfigError> {
        let change = self.write(|tx| f(&SettingsStore::new(tx)))?;
        info!(
            changed = ?change.changed_keys,
            credentials_rotated = change.credentials_rotated,
            "Settings updated"
        );
        if change.credentials_rotated {
            self.sessions
                .invalidate_sessions(InvalidationReason::CredentialsRotated);
        }
        Ok(change)
    }

    // -------------------------------------------------------------------------
    // Critical Sections
    // -------------------------------------------------------------------------

    fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        let db = self.db.lock();
        f(db.conn())
    }

    /// Run `f` in an immediate transaction; commit on `Ok`, roll back on `Err`.
    fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        let mut db = self.db.lock();
        let tx = db.write_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}
