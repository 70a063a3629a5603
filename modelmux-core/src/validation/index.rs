//! Id and name lookups for reference and uniqueness checks.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::composites::{CompositeModel, CompositeRegistry};
use crate::error::ConfigError;
use crate::models::{Model, ModelRegistry, ModelType};
use crate::providers::{Provider, ProviderRegistry};

/// Everything the validators need to know about the rest of a configuration.
///
/// Built from stored records when saving a single entity, or from the
/// records of an import document when validating it as a whole. Names are
/// owned by the first id registered under them.
#[derive(Debug, Default, Clone)]
pub struct ConfigIndex {
    provider_ids: HashSet<String>,
    provider_names: HashMap<String, String>,
    model_types: HashMap<String, ModelType>,
    model_names: HashMap<(ModelType, String), String>,
    composite_ids: HashSet<String>,
    composite_names: HashMap<String, String>,
    /// model id -> roles it fills in composites, with the composite's name
    model_roles: HashMap<String, Vec<(ModelType, String)>>,
}

impl ConfigIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(
        providers: &[Provider],
        models: &[Model],
        composites: &[CompositeModel],
    ) -> Self {
        let mut index = Self::new();
        for p in providers {
            index.add_provider(&p.id, &p.provider_name);
        }
        for m in models {
            index.add_model(&m.id, m.model_type, &m.model_name);
        }
        for c in composites {
            index.add_composite(
                &c.id,
                &c.model_name,
                &c.reasoner_model_id,
                &c.general_model_id,
            );
        }
        index
    }

    /// Snapshot of everything currently stored.
    pub(crate) fn load(conn: &Connection) -> Result<Self, ConfigError> {
        let providers = ProviderRegistry::new(conn).list()?;
        let models = ModelRegistry::new(conn).list()?;
        let composites = CompositeRegistry::new(conn).list()?;
        Ok(Self::from_records(&providers, &models, &composites))
    }

    /// Register a provider. Returns `false` if the id was already present.
    pub fn add_provider(&mut self, id: &str, name: &str) -> bool {
        self.provider_names
            .entry(name.trim().to_string())
            .or_insert_with(|| id.to_string());
        self.provider_ids.insert(id.to_string())
    }

    /// Register a model. Returns `false` if the id was already present.
    pub fn add_model(&mut self, id: &str, model_type: ModelType, name: &str) -> bool {
        self.model_names
            .entry((model_type, name.trim().to_string()))
            .or_insert_with(|| id.to_string());
        if self.model_types.contains_key(id) {
            return false;
        }
        self.model_types.insert(id.to_string(), model_type);
        true
    }

    /// Register a composite. Returns `false` if the id was already present.
    pub fn add_composite(
        &mut self,
        id: &str,
        name: &str,
        reasoner_model_id: &str,
        general_model_id: &str,
    ) -> bool {
        let name = name.trim().to_string();
        self.composite_names
            .entry(name.clone())
            .or_insert_with(|| id.to_string());
        for (role, model_id) in [
            (ModelType::Reasoner, reasoner_model_id),
            (ModelType::General, general_model_id),
        ] {
            self.model_roles
                .entry(model_id.trim().to_string())
                .or_default()
                .push((role, name.clone()));
        }
        self.composite_ids.insert(id.to_string())
    }

    pub fn has_provider(&self, id: &str) -> bool {
        self.provider_ids.contains(id)
    }

    /// Type of the model with this id, if it exists.
    pub fn model_type(&self, id: &str) -> Option<ModelType> {
        self.model_types.get(id).copied()
    }

    pub fn provider_name_owner(&self, name: &str) -> Option<&str> {
        self.provider_names.get(name).map(String::as_str)
    }

    pub fn model_name_owner(&self, model_type: ModelType, name: &str) -> Option<&str> {
        self.model_names
            .get(&(model_type, name.to_string()))
            .map(String::as_str)
    }

    pub fn composite_name_owner(&self, name: &str) -> Option<&str> {
        self.composite_names.get(name).map(String::as_str)
    }

    /// Roles a model fills in composites, paired with the composite's name.
    pub fn composite_roles(&self, model_id: &str) -> &[(ModelType, String)] {
        self.model_roles
            .get(model_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
