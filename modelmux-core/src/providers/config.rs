//! Provider record and its unvalidated input form.

use serde::{Deserialize, Serialize};

use super::types::ProviderFormat;

/// A validated upstream API provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    /// Unique display name (e.g., "deepseek-official")
    pub provider_name: String,
    /// Upstream credential; may be empty for keyless endpoints
    pub api_key: String,
    /// Scheme and host, e.g. "https://api.deepseek.com"
    pub api_base_url: String,
    /// Request path appended to the base URL, e.g. "/v1/chat/completions"
    pub api_request_address: String,
    pub provider_format: ProviderFormat,
    /// Route requests to this provider through the configured proxy
    pub is_proxy_open: bool,
    pub is_valid: bool,
}

impl Provider {
    /// Full endpoint URL for chat requests.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.api_request_address.trim_start_matches('/')
        )
    }
}

/// Provider input as submitted by a form or an import document.
///
/// `id: None` creates a new provider; `Some(id)` updates an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDraft {
    pub id: Option<String>,
    pub provider_name: String,
    pub api_key: String,
    pub api_base_url: String,
    pub api_request_address: String,
    pub provider_format: String,
    pub is_proxy_open: bool,
    pub is_valid: bool,
}

impl From<&Provider> for ProviderDraft {
    fn from(provider: &Provider) -> Self {
        Self {
            id: Some(provider.id.clone()),
            provider_name: provider.provider_name.clone(),
            api_key: provider.api_key.clone(),
            api_base_url: provider.api_base_url.clone(),
            api_request_address: provider.api_request_address.clone(),
            provider_format: provider.provider_format.to_string(),
            is_proxy_open: provider.is_proxy_open,
            is_valid: provider.is_valid,
        }
    }
}
