//! Model record and its unvalidated input form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::CustomJson;

use super::types::{ModelFormat, ModelType};

/// A validated model bound to one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    /// Display name, unique within `model_type` (e.g., "deepseek-r1")
    pub model_name: String,
    /// The model ID sent upstream (e.g., "deepseek-reasoner")
    pub model_id: String,
    pub provider_id: String,
    pub model_type: ModelType,
    pub model_format: ModelFormat,
    /// Extra request parameters merged into upstream calls
    pub model_custom_json: Option<CustomJson>,
    /// Upstream returns reasoning natively (reasoner models only)
    pub is_origin_reasoning: bool,
    /// Pass the upstream output through unchanged
    pub is_origin_output: bool,
    pub is_valid: bool,
}

/// Model input as submitted by a form or an import document.
///
/// `model_type` and `model_format` stay raw strings and
/// `model_custom_json` may be JSON text or an inline object; the
/// validator turns bad values into violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDraft {
    pub id: Option<String>,
    pub model_name: String,
    pub model_id: String,
    pub provider_id: String,
    pub model_type: String,
    pub model_format: String,
    pub model_custom_json: Option<Value>,
    pub is_origin_reasoning: bool,
    pub is_origin_output: bool,
    pub is_valid: bool,
}

impl From<&Model> for ModelDraft {
    fn from(model: &Model) -> Self {
        Self {
            id: Some(model.id.clone()),
            model_name: model.model_name.clone(),
            model_id: model.model_id.clone(),
            provider_id: model.provider_id.clone(),
            model_type: model.model_type.to_string(),
            model_format: model.model_format.to_string(),
            model_custom_json: model
                .model_custom_json
                .as_ref()
                .map(|custom| Value::Object(custom.as_map().clone())),
            is_origin_reasoning: model.is_origin_reasoning,
            is_origin_output: model.is_origin_output,
            is_valid: model.is_valid,
        }
    }
}

/// Valid models split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidModels {
    pub reasoner: Vec<Model>,
    pub general: Vec<Model>,
}
