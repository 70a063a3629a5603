//! Composite models: one reasoner model paired with one general model.

mod registry;

use serde::{Deserialize, Serialize};

pub use registry::CompositeRegistry;

/// A validated reasoner + general pairing exposed to clients under one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeModel {
    pub id: String,
    pub model_name: String,
    pub reasoner_model_id: String,
    pub general_model_id: String,
    pub is_valid: bool,
}

/// Composite input as submitted by a form or an import document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeDraft {
    pub id: Option<String>,
    pub model_name: String,
    pub reasoner_model_id: String,
    pub general_model_id: String,
    pub is_valid: bool,
}

impl From<&CompositeModel> for CompositeDraft {
    fn from(composite: &CompositeModel) -> Self {
        Self {
            id: Some(composite.id.clone()),
            model_name: composite.model_name.clone(),
            reasoner_model_id: composite.reasoner_model_id.clone(),
            general_model_id: composite.general_model_id.clone(),
            is_valid: composite.is_valid,
        }
    }
}
