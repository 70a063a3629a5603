//! Whole-configuration export and import.
//!
//! The exported document carries every provider, model, composite model and
//! setting (secrets included). Importing validates the document on its own,
//! then replaces all stored configuration in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::composites::{CompositeDraft, CompositeModel, CompositeRegistry};
use crate::config::{SettingEntry, SettingsStore, SystemSettings};
use crate::error::ConfigError;
use crate::hooks::InvalidationReason;
use crate::models::{Model, ModelDraft, ModelRegistry, ModelType};
use crate::providers::{Provider, ProviderDraft, ProviderRegistry};
use crate::validation::{
    validate_composite, validate_model, validate_provider, ConfigIndex, ValidationErrors,
    ViolationKind,
};

use super::IntegrityCoordinator;

/// Current document format.
pub const FORMAT_VERSION: u32 = 1;

/// A complete, validated configuration as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub providers: Vec<Provider>,
    pub reasoner_models: Vec<Model>,
    pub general_models: Vec<Model>,
    pub composite_models: Vec<CompositeModel>,
    pub settings: Vec<SettingEntry>,
}

impl ConfigSnapshot {
    /// The same configuration as an importable document.
    pub fn to_document(&self) -> ConfigDocument {
        ConfigDocument {
            format_version: Some(self.format_version),
            providers: self.providers.iter().map(ProviderDraft::from).collect(),
            reasoner_models: self.reasoner_models.iter().map(ModelDraft::from).collect(),
            general_models: self.general_models.iter().map(ModelDraft::from).collect(),
            composite_models: self.composite_models.iter().map(CompositeDraft::from).collect(),
            settings: self.settings.clone(),
        }
    }
}

/// A configuration document as read for import.
///
/// Unknown keys are ignored and missing sections default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub format_version: Option<u32>,
    pub providers: Vec<ProviderDraft>,
    pub reasoner_models: Vec<ModelDraft>,
    pub general_models: Vec<ModelDraft>,
    pub composite_models: Vec<CompositeDraft>,
    pub settings: Vec<SettingEntry>,
}

/// Record counts written by a successful import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub providers: usize,
    pub reasoner_models: usize,
    pub general_models: usize,
    pub composite_models: usize,
    pub settings: usize,
}

/// A document that passed validation, ready to write.
#[derive(Debug)]
struct ValidatedConfig {
    providers: Vec<Provider>,
    models: Vec<Model>,
    composites: Vec<CompositeModel>,
    settings: SystemSettings,
}

impl IntegrityCoordinator {
    /// Snapshot the whole configuration, read in one transaction.
    pub fn export_config(&self) -> Result<ConfigSnapshot, ConfigError> {
        let mut db = self.db.lock();
        let tx = db.read_transaction()?;

        let models = ModelRegistry::new(&tx);
        let snapshot = ConfigSnapshot {
            format_version: FORMAT_VERSION,
            exported_at: Utc::now(),
            providers: ProviderRegistry::new(&tx).list()?,
            reasoner_models: models.list_by_type(ModelType::Reasoner)?,
            general_models: models.list_by_type(ModelType::General)?,
            composite_models: CompositeRegistry::new(&tx).list()?,
            settings: SettingsStore::new(&tx).get_all()?.entries(),
        };
        tx.commit()?;

        debug!(
            providers = snapshot.providers.len(),
            reasoner_models = snapshot.reasoner_models.len(),
            general_models = snapshot.general_models.len(),
            composite_models = snapshot.composite_models.len(),
            "Exported configuration"
        );
        Ok(snapshot)
    }

    /// Export as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.export_config()?)?)
    }

    /// Replace the whole configuration with `document`.
    ///
    /// The document must be self-consistent: every reference resolves to a
    /// record in the same document. On any violation nothing is changed.
    pub fn import_config(&self, document: &ConfigDocument) -> Result<ImportSummary, ConfigError> {
        let validated = validate_document(document)?;

        let summary = self.write(|tx| {
            CompositeRegistry::new(tx).clear()?;
            ModelRegistry::new(tx).clear()?;
            ProviderRegistry::new(tx).clear()?;
            let settings = SettingsStore::new(tx);
            settings.clear()?;

            let providers = ProviderRegistry::new(tx);
            for provider in &validated.providers {
                providers.insert(provider)?;
            }
            let models = ModelRegistry::new(tx);
            for model in &validated.models {
                models.insert(model)?;
            }
            let composites = CompositeRegistry::new(tx);
            for composite in &validated.composites {
                composites.insert(composite)?;
            }
            settings.replace_all(&validated.settings)?;

            Ok(ImportSummary {
                providers: validated.providers.len(),
                reasoner_models: document.reasoner_models.len(),
                general_models: document.general_models.len(),
                composite_models: validated.composites.len(),
                settings: document.settings.len(),
            })
        })?;

        info!(
            providers = summary.providers,
            reasoner_models = summary.reasoner_models,
            general_models = summary.general_models,
            composite_models = summary.composite_models,
            "Configuration imported"
        );
        self.sessions
            .invalidate_sessions(InvalidationReason::ConfigImported);
        Ok(summary)
    }

    /// Parse and import a JSON document.
    pub fn import_json(&self, text: &str) -> Result<ImportSummary, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(text).map_err(|e| {
            ValidationErrors::single(
                "document",
                ViolationKind::Malformed,
                format!("invalid configuration document: {e}"),
            )
        })?;
        self.import_config(&document)
    }
}

/// Validate a document in isolation, collecting every violation.
fn validate_document(document: &ConfigDocument) -> Result<ValidatedConfig, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Some(version) = document.format_version {
        if version > FORMAT_VERSION {
            errors.push(
                "format_version",
                ViolationKind::InvalidValue,
                format!("unsupported format version {version} (newest is {FORMAT_VERSION})"),
            );
        }
    }

    // First pass: register every id and name so references may point forward.
    let mut index = ConfigIndex::new();

    let provider_ids: Vec<Option<String>> = document
        .providers
        .iter()
        .enumerate()
        .map(|(i, draft)| {
            let path = format!("providers[{i}]");
            let id = required_id(&mut errors, &path, draft.id.as_deref())?;
            if !index.add_provider(&id, &draft.provider_name) {
                errors.push(
                    format!("{path}.id"),
                    ViolationKind::Duplicate,
                    format!("provider id '{id}' appears more than once"),
                );
                return None;
            }
            Some(id)
        })
        .collect();

    let sections = [
        ("reasoner_models", ModelType::Reasoner, &document.reasoner_models),
        ("general_models", ModelType::General, &document.general_models),
    ];
    let mut model_ids: Vec<(String, ModelDraft, Option<String>)> = Vec::new();
    for (section, model_type, drafts) in sections {
        for (i, draft) in drafts.iter().enumerate() {
            let path = format!("{section}[{i}]");

            let declared = draft.model_type.trim();
            if !declared.is_empty() && declared.parse::<ModelType>().ok() != Some(model_type) {
                errors.push(
                    format!("{path}.model_type"),
                    ViolationKind::InvalidValue,
                    format!("models in {section} must have model_type '{model_type}', got '{declared}'"),
                );
            }

            let mut draft = draft.clone();
            draft.model_type = model_type.to_string();

            let id = required_id(&mut errors, &path, draft.id.as_deref()).and_then(|id| {
                if index.add_model(&id, model_type, &draft.model_name) {
                    Some(id)
                } else {
                    errors.push(
                        format!("{path}.id"),
                        ViolationKind::Duplicate,
                        format!("model id '{id}' appears more than once"),
                    );
                    None
                }
            });
            model_ids.push((path, draft, id));
        }
    }

    let composite_ids: Vec<Option<String>> = document
        .composite_models
        .iter()
        .enumerate()
        .map(|(i, draft)| {
            let path = format!("composite_models[{i}]");
            let id = required_id(&mut errors, &path, draft.id.as_deref())?;
            if !index.add_composite(
                &id,
                &draft.model_name,
                &draft.reasoner_model_id,
                &draft.general_model_id,
            ) {
                errors.push(
                    format!("{path}.id"),
                    ViolationKind::Duplicate,
                    format!("composite model id '{id}' appears more than once"),
                );
                return None;
            }
            Some(id)
        })
        .collect();

    // Second pass: validate each record against the complete index.
    let mut providers = Vec::with_capacity(document.providers.len());
    for (i, (draft, id)) in document.providers.iter().zip(&provider_ids).enumerate() {
        let Some(id) = id else { continue };
        match validate_provider(id, draft, &index) {
            Ok(provider) => providers.push(provider),
            Err(e) => errors.extend_prefixed(&format!("providers[{i}]"), e),
        }
    }

    let mut models = Vec::with_capacity(model_ids.len());
    for (path, draft, id) in &model_ids {
        let Some(id) = id else { continue };
        match validate_model(id, draft, &index) {
            Ok(model) => models.push(model),
            Err(e) => errors.extend_prefixed(path, e),
        }
    }

    let mut composites = Vec::with_capacity(document.composite_models.len());
    for (i, (draft, id)) in document
        .composite_models
        .iter()
        .zip(&composite_ids)
        .enumerate()
    {
        let Some(id) = id else { continue };
        match validate_composite(id, draft, &index) {
            Ok(composite) => composites.push(composite),
            Err(e) => errors.extend_prefixed(&format!("composite_models[{i}]"), e),
        }
    }

    let settings = match SystemSettings::default().apply(&document.settings) {
        Ok(settings) => settings,
        Err(e) => {
            errors.extend_prefixed("settings", e);
            SystemSettings::default()
        }
    };

    errors.into_result(ValidatedConfig {
        providers,
        models,
        composites,
        settings,
    })
}

fn required_id(errors: &mut ValidationErrors, path: &str, id: Option<&str>) -> Option<String> {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => Some(id.to_string()),
        None => {
            errors.push(
                format!("{path}.id"),
                ViolationKind::Required,
                "id is required in an imported document",
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> ConfigDocument {
        serde_json::from_value(json!({
            "providers": [{
                "id": "p1",
                "provider_name": "deepseek",
                "api_key": "sk-1",
                "api_base_url": "https://api.deepseek.com",
                "api_request_address": "/v1/chat/completions",
                "provider_format": "deepseek"
            }],
            "reasoner_models": [{
                "id": "r1",
                "model_name": "deepseek-r1",
                "model_id": "deepseek-reasoner",
                "provider_id": "p1",
                "model_format": "deepseek",
                "is_origin_reasoning": true
            }],
            "general_models": [{
                "id": "g1",
                "model_name": "deepseek-v3",
                "model_id": "deepseek-chat",
                "provider_id": "p1",
                "model_format": "openai",
                "model_custom_json": "{\"temperature\": 0.3}"
            }],
            "composite_models": [{
                "id": "c1",
                "model_name": "r1-v3",
                "reasoner_model_id": "r1",
                "general_model_id": "g1"
            }],
            "settings": [
                {"key": "log_level", "value": "debug", "type": "str"},
                {"key": "tcp_connector_limit", "value": 20, "type": "int"},
                {"key": "proxy_open", "value": "true", "type": "bool"}
            ],
            "some_future_key": true
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_document() {
        let validated = validate_document(&document()).unwrap();
        assert_eq!(validated.providers.len(), 1);
        assert_eq!(validated.models.len(), 2);
        assert_eq!(validated.models[0].model_type, ModelType::Reasoner);
        assert_eq!(validated.models[1].model_type, ModelType::General);
        assert_eq!(validated.composites.len(), 1);
        assert_eq!(validated.settings.tcp_connector_limit, 20);
        assert!(validated.settings.proxy_open);
    }

    #[test]
    fn test_ids_required() {
        let mut doc = document();
        doc.providers[0].id = None;

        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.has_field("providers[0].id"));
        // models referencing the id-less provider can't resolve it
        assert!(errors.has_field("reasoner_models[0].provider_id"));
    }

    #[test]
    fn test_duplicate_ids_and_names() {
        let mut doc = document();
        let mut second = doc.providers[0].clone();
        doc.providers.push(second.clone());
        second.id = Some("p2".to_string());
        doc.providers.push(second);
        let composite = doc.composite_models[0].clone();
        doc.composite_models.push(composite);

        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.has_field("providers[1].id"));
        assert!(errors.has_field("composite_models[1].id"));
        assert!(errors.has_field("providers[2].provider_name"));
    }

    #[test]
    fn test_section_decides_model_type() {
        let mut doc = document();
        doc.general_models[0].model_type = "reasoner".to_string();

        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.has_field("general_models[0].model_type"));
    }

    #[test]
    fn test_violation_paths_are_prefixed() {
        let mut doc = document();
        doc.composite_models[0].general_model_id = "missing".to_string();
        doc.settings.push(SettingEntry::new("tcp_keepalive_timeout", -1.0));

        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.has_field("composite_models[0].general_model_id"));
        assert!(errors.has_field("settings.tcp_keepalive_timeout"));
    }

    #[test]
    fn test_newer_format_rejected() {
        let mut doc = document();
        doc.format_version = Some(FORMAT_VERSION + 1);
        assert!(validate_document(&doc)
            .unwrap_err()
            .has_field("format_version"));
    }
}
