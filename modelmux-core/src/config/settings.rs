//! System settings for the router.
//!
//! Settings are a closed set of typed keys, persisted one row per key.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;
use crate::validation::{ValidationErrors, ViolationKind};

use super::values::{LogLevel, SettingEntry, SettingType, SettingValue};

// =============================================================================
// Setting Keys
// =============================================================================

/// Every setting the router knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Key clients must present to the router
    ApiKey,
    /// Master switch for the outbound proxy
    ProxyOpen,
    /// Outbound proxy used by providers with `is_proxy_open`
    ProxyAddress,
    LogLevel,
    /// Total outbound connection limit
    TcpConnectorLimit,
    /// Per-host outbound connection limit (0 = unlimited)
    TcpConnectorLimitPerHost,
    /// Keep-alive timeout in seconds
    TcpKeepaliveTimeout,
    /// Provider client instances kept warm
    ModelCacheSize,
    SaveDeepseekTokens,
    SaveDeepseekTokensMaxTokens,
}

impl SettingKey {
    pub const ALL: [SettingKey; 10] = [
        SettingKey::ApiKey,
        SettingKey::ProxyOpen,
        SettingKey::ProxyAddress,
        SettingKey::LogLevel,
        SettingKey::TcpConnectorLimit,
        SettingKey::TcpConnectorLimitPerHost,
        SettingKey::TcpKeepaliveTimeout,
        SettingKey::ModelCacheSize,
        SettingKey::SaveDeepseekTokens,
        SettingKey::SaveDeepseekTokensMaxTokens,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ApiKey => "api_key",
            SettingKey::ProxyOpen => "proxy_open",
            SettingKey::ProxyAddress => "proxy_address",
            SettingKey::LogLevel => "log_level",
            SettingKey::TcpConnectorLimit => "tcp_connector_limit",
            SettingKey::TcpConnectorLimitPerHost => "tcp_connector_limit_per_host",
            SettingKey::TcpKeepaliveTimeout => "tcp_keepalive_timeout",
            SettingKey::ModelCacheSize => "model_cache_size",
            SettingKey::SaveDeepseekTokens => "save_deepseek_tokens",
            SettingKey::SaveDeepseekTokensMaxTokens => "save_deepseek_tokens_max_tokens",
        }
    }

    pub fn setting_type(&self) -> SettingType {
        match self {
            SettingKey::ApiKey | SettingKey::ProxyAddress | SettingKey::LogLevel => {
                SettingType::Str
            }
            SettingKey::TcpConnectorLimit
            | SettingKey::TcpConnectorLimitPerHost
            | SettingKey::ModelCacheSize
            | SettingKey::SaveDeepseekTokensMaxTokens => SettingType::Int,
            SettingKey::TcpKeepaliveTimeout => SettingType::Float,
            SettingKey::ProxyOpen | SettingKey::SaveDeepseekTokens => SettingType::Bool,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("setting key", s, &Self::ALL.map(|k| k.as_str())))
    }
}

// =============================================================================
// System Settings
// =============================================================================

/// The full, typed set of system settings.
///
/// Serializes as a flat `{key: value}` mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSettings {
    pub api_key: String,
    pub proxy_open: bool,
    pub proxy_address: String,
    pub log_level: LogLevel,
    pub tcp_connector_limit: i64,
    pub tcp_connector_limit_per_host: i64,
    pub tcp_keepalive_timeout: f64,
    pub model_cache_size: i64,
    pub save_deepseek_tokens: bool,
    pub save_deepseek_tokens_max_tokens: i64,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            api_key: "123456".to_string(),
            proxy_open: false,
            proxy_address: "127.0.0.1:7890".to_string(),
            log_level: LogLevel::Info,
            tcp_connector_limit: 100,
            tcp_connector_limit_per_host: 0,
            tcp_keepalive_timeout: 30.0,
            model_cache_size: 5,
            save_deepseek_tokens: false,
            save_deepseek_tokens_max_tokens: 5,
        }
    }
}

impl SystemSettings {
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::ApiKey => SettingValue::Str(self.api_key.clone()),
            SettingKey::ProxyOpen => SettingValue::Bool(self.proxy_open),
            SettingKey::ProxyAddress => SettingValue::Str(self.proxy_address.clone()),
            SettingKey::LogLevel => SettingValue::Str(self.log_level.to_string()),
            SettingKey::TcpConnectorLimit => SettingValue::Int(self.tcp_connector_limit),
            SettingKey::TcpConnectorLimitPerHost => {
                SettingValue::Int(self.tcp_connector_limit_per_host)
            }
            SettingKey::TcpKeepaliveTimeout => SettingValue::Float(self.tcp_keepalive_timeout),
            SettingKey::ModelCacheSize => SettingValue::Int(self.model_cache_size),
            SettingKey::SaveDeepseekTokens => SettingValue::Bool(self.save_deepseek_tokens),
            SettingKey::SaveDeepseekTokensMaxTokens => {
                SettingValue::Int(self.save_deepseek_tokens_max_tokens)
            }
        }
    }

    /// Assign one already-coerced value, enforcing single-key rules.
    ///
    /// Range rules are checked separately by [`Self::check_connection_pool`]
    /// and [`Self::check_counts`].
    pub(crate) fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<(), String> {
        match (key, value) {
            (SettingKey::ApiKey, SettingValue::Str(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Err("api_key must not be empty".to_string());
                }
                self.api_key = s.to_string();
            }
            (SettingKey::ProxyOpen, SettingValue::Bool(b)) => {
                self.proxy_open = b;
            }
            (SettingKey::ProxyAddress, SettingValue::Str(s)) => {
                self.proxy_address = s.trim().to_string();
            }
            (SettingKey::LogLevel, SettingValue::Str(s)) => {
                self.log_level = s.parse().map_err(|e: ParseEnumError| e.to_string())?;
            }
            (SettingKey::TcpConnectorLimit, SettingValue::Int(i)) => {
                self.tcp_connector_limit = i;
            }
            (SettingKey::TcpConnectorLimitPerHost, SettingValue::Int(i)) => {
                self.tcp_connector_limit_per_host = i;
            }
            (SettingKey::TcpKeepaliveTimeout, SettingValue::Float(f)) => {
                self.tcp_keepalive_timeout = f;
            }
            (SettingKey::TcpKeepaliveTimeout, SettingValue::Int(i)) => {
                self.tcp_keepalive_timeout = i as f64;
            }
            (SettingKey::ModelCacheSize, SettingValue::Int(i)) => {
                self.model_cache_size = i;
            }
            (SettingKey::SaveDeepseekTokens, SettingValue::Bool(b)) => {
                self.save_deepseek_tokens = b;
            }
            (SettingKey::SaveDeepseekTokensMaxTokens, SettingValue::Int(i)) => {
                self.save_deepseek_tokens_max_tokens = i;
            }
            (key, value) => {
                return Err(format!(
                    "{key} is a {} setting, got {}",
                    key.setting_type(),
                    value.setting_type()
                ));
            }
        }
        Ok(())
    }

    /// Apply a batch of entries to a copy of these settings.
    ///
    /// Every entry is coerced and checked, then the connection-pool rule is
    /// checked on the merged result. Either the whole batch applies or all
    /// violations are returned.
    pub fn apply(&self, entries: &[SettingEntry]) -> Result<SystemSettings, ValidationErrors> {
        let mut next = self.clone();
        let mut errors = ValidationErrors::new();
        let mut seen = HashSet::new();

        for (i, entry) in entries.iter().enumerate() {
            let raw_key = entry.key.trim();
            if raw_key.is_empty() {
                errors.push(
                    format!("[{i}].key"),
                    ViolationKind::Required,
                    "setting key is required",
                );
                continue;
            }
            let key = match raw_key.parse::<SettingKey>() {
                Ok(key) => key,
                Err(e) => {
                    errors.push(raw_key, ViolationKind::InvalidValue, e.to_string());
                    continue;
                }
            };
            if !seen.insert(key) {
                errors.push(
                    raw_key,
                    ViolationKind::Duplicate,
                    format!("{key} is given more than once"),
                );
                continue;
            }

            if let Some(declared) = entry
                .setting_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
            {
                match declared.parse::<SettingType>() {
                    Ok(ty) if ty.fits(key.setting_type()) => {}
                    Ok(ty) => {
                        errors.push(
                            raw_key,
                            ViolationKind::InvalidValue,
                            format!("{key} is a {} setting, declared as {ty}", key.setting_type()),
                        );
                        continue;
                    }
                    Err(e) => {
                        errors.push(raw_key, ViolationKind::InvalidValue, e.to_string());
                        continue;
                    }
                }
            }

            let value = match SettingValue::coerce(key.setting_type(), &entry.value) {
                Ok(value) => value,
                Err(message) => {
                    errors.push(raw_key, ViolationKind::InvalidValue, format!("{key}: {message}"));
                    continue;
                }
            };
            if let Err(message) = next.set(key, value) {
                errors.push(raw_key, ViolationKind::InvalidValue, message);
            }
        }

        next.check_connection_pool(&mut errors);
        next.check_counts(&mut errors);
        errors.into_result(next)
    }

    /// `limit >= per_host >= 0` and a non-negative keep-alive.
    pub fn check_connection_pool(&self, errors: &mut ValidationErrors) {
        if self.tcp_connector_limit_per_host < 0 {
            errors.push(
                SettingKey::TcpConnectorLimitPerHost.as_str(),
                ViolationKind::OutOfRange,
                format!(
                    "tcp_connector_limit_per_host must be >= 0, got {}",
                    self.tcp_connector_limit_per_host
                ),
            );
        } else if self.tcp_connector_limit < self.tcp_connector_limit_per_host {
            errors.push(
                SettingKey::TcpConnectorLimit.as_str(),
                ViolationKind::OutOfRange,
                format!(
                    "tcp_connector_limit ({}) must be >= tcp_connector_limit_per_host ({})",
                    self.tcp_connector_limit, self.tcp_connector_limit_per_host
                ),
            );
        }
        if self.tcp_keepalive_timeout < 0.0 {
            errors.push(
                SettingKey::TcpKeepaliveTimeout.as_str(),
                ViolationKind::OutOfRange,
                format!(
                    "tcp_keepalive_timeout must be >= 0, got {}",
                    self.tcp_keepalive_timeout
                ),
            );
        }
    }

    /// Cache and token counts must not be negative.
    pub fn check_counts(&self, errors: &mut ValidationErrors) {
        for (key, value) in [
            (SettingKey::ModelCacheSize, self.model_cache_size),
            (
                SettingKey::SaveDeepseekTokensMaxTokens,
                self.save_deepseek_tokens_max_tokens,
            ),
        ] {
            if value < 0 {
                errors.push(
                    key.as_str(),
                    ViolationKind::OutOfRange,
                    format!("{key} must be >= 0, got {value}"),
                );
            }
        }
    }

    /// Keys whose values differ between `self` and `other`.
    pub fn diff(&self, other: &SystemSettings) -> Vec<SettingKey> {
        SettingKey::ALL
            .into_iter()
            .filter(|key| self.get(*key) != other.get(*key))
            .collect()
    }

    /// All settings as typed entries, in key order.
    pub fn entries(&self) -> Vec<SettingEntry> {
        SettingKey::ALL
            .into_iter()
            .map(|key| SettingEntry::typed(key.as_str(), self.get(key).to_json(), key.setting_type()))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool(limit: i64, per_host: i64, keepalive: f64) -> Vec<SettingEntry> {
        vec![
            SettingEntry::new("tcp_connector_limit", limit),
            SettingEntry::new("tcp_connector_limit_per_host", per_host),
            SettingEntry::new("tcp_keepalive_timeout", keepalive),
        ]
    }

    // -------------------------------------------------------------------------
    // Defaults
    // -------------------------------------------------------------------------

    #[test]
    fn test_defaults() {
        let settings = SystemSettings::default();
        assert_eq!(settings.api_key, "123456");
        assert_eq!(settings.proxy_address, "127.0.0.1:7890");
        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.tcp_connector_limit, 100);
        assert_eq!(settings.tcp_connector_limit_per_host, 0);
        assert!((settings.tcp_keepalive_timeout - 30.0).abs() < f64::EPSILON);
        assert!(!settings.proxy_open);
        assert_eq!(settings.model_cache_size, 5);
        assert!(!settings.save_deepseek_tokens);
        assert_eq!(settings.save_deepseek_tokens_max_tokens, 5);
    }

    #[test]
    fn test_key_types() {
        assert_eq!(SettingKey::ProxyOpen.setting_type(), SettingType::Bool);
        assert_eq!(SettingKey::SaveDeepseekTokens.setting_type(), SettingType::Bool);
        assert_eq!(SettingKey::ModelCacheSize.setting_type(), SettingType::Int);
        assert_eq!(
            "save_deepseek_tokens_max_tokens".parse::<SettingKey>().unwrap(),
            SettingKey::SaveDeepseekTokensMaxTokens
        );
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(SystemSettings::default()).unwrap();
        assert_eq!(json["log_level"], "INFO");
        assert_eq!(json["tcp_connector_limit"], 100);
        assert_eq!(json["proxy_open"], false);
        assert_eq!(json.as_object().unwrap().len(), SettingKey::ALL.len());
    }

    // -------------------------------------------------------------------------
    // Apply
    // -------------------------------------------------------------------------

    #[test]
    fn test_pool_ordering_enforced() {
        let settings = SystemSettings::default();

        let errors = settings.apply(&pool(5, 10, 30.0)).unwrap_err();
        assert!(errors.has_field("tcp_connector_limit"));
        assert!(errors.all_of_kind(ViolationKind::OutOfRange));

        let next = settings.apply(&pool(10, 5, 30.0)).unwrap();
        assert_eq!(next.tcp_connector_limit, 10);
        assert_eq!(next.tcp_connector_limit_per_host, 5);
    }

    #[test]
    fn test_pool_checked_against_merged_state() {
        let settings = SystemSettings {
            tcp_connector_limit: 10,
            ..Default::default()
        };
        // per_host alone above the stored limit
        let errors = settings
            .apply(&[SettingEntry::new("tcp_connector_limit_per_host", 20)])
            .unwrap_err();
        assert!(errors.has_field("tcp_connector_limit"));
    }

    #[test]
    fn test_negative_values_out_of_range() {
        let errors = SystemSettings::default()
            .apply(&pool(10, -1, -2.0))
            .unwrap_err();
        assert!(errors.has_field("tcp_connector_limit_per_host"));
        assert!(errors.has_field("tcp_keepalive_timeout"));
    }

    #[test]
    fn test_bool_settings_coerced() {
        let next = SystemSettings::default()
            .apply(&[
                SettingEntry::new("proxy_open", true),
                SettingEntry::new("save_deepseek_tokens", "yes"),
            ])
            .unwrap();
        assert!(next.proxy_open);
        assert!(next.save_deepseek_tokens);

        let errors = SystemSettings::default()
            .apply(&[SettingEntry::new("proxy_open", "maybe")])
            .unwrap_err();
        assert!(errors.has_field("proxy_open"));

        let errors = SystemSettings::default()
            .apply(&[SettingEntry::typed("proxy_open", "true", SettingType::Str)])
            .unwrap_err();
        assert!(errors.has_field("proxy_open"));
    }

    #[test]
    fn test_negative_counts_out_of_range() {
        let errors = SystemSettings::default()
            .apply(&[
                SettingEntry::new("model_cache_size", -1),
                SettingEntry::new("save_deepseek_tokens_max_tokens", -5),
            ])
            .unwrap_err();
        assert!(errors.has_field("model_cache_size"));
        assert!(errors.has_field("save_deepseek_tokens_max_tokens"));
        assert!(errors.all_of_kind(ViolationKind::OutOfRange));

        let next = SystemSettings::default()
            .apply(&[SettingEntry::new("model_cache_size", 0)])
            .unwrap();
        assert_eq!(next.model_cache_size, 0);
    }

    #[test]
    fn test_log_level_normalized() {
        let next = SystemSettings::default()
            .apply(&[SettingEntry::new("log_level", "debug")])
            .unwrap();
        assert_eq!(next.log_level, LogLevel::Debug);

        let errors = SystemSettings::default()
            .apply(&[SettingEntry::new("log_level", "LOUD")])
            .unwrap_err();
        assert!(errors.has_field("log_level"));
    }

    #[test]
    fn test_api_key_must_not_be_empty() {
        let errors = SystemSettings::default()
            .apply(&[SettingEntry::new("api_key", "  ")])
            .unwrap_err();
        assert!(errors.has_field("api_key"));
    }

    #[test]
    fn test_unknown_and_duplicate_keys() {
        let errors = SystemSettings::default()
            .apply(&[
                SettingEntry::new("color", "blue"),
                SettingEntry::new("proxy_address", "a:1"),
                SettingEntry::new("proxy_address", "b:2"),
            ])
            .unwrap_err();

        let kinds: Vec<(&str, ViolationKind)> = errors
            .iter()
            .map(|v| (v.field.as_str(), v.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("color", ViolationKind::InvalidValue),
                ("proxy_address", ViolationKind::Duplicate),
            ]
        );
    }

    #[test]
    fn test_declared_type_must_match() {
        let errors = SystemSettings::default()
            .apply(&[SettingEntry::typed("tcp_connector_limit", "10", SettingType::Str)])
            .unwrap_err();
        assert!(errors.has_field("tcp_connector_limit"));

        // int widens into a float setting
        let next = SystemSettings::default()
            .apply(&[SettingEntry::typed("tcp_keepalive_timeout", 45, SettingType::Int)])
            .unwrap();
        assert!((next.tcp_keepalive_timeout - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let next = SystemSettings::default()
            .apply(&[
                SettingEntry::new("tcp_connector_limit", "200"),
                SettingEntry::new("tcp_keepalive_timeout", json!("12.5")),
            ])
            .unwrap();
        assert_eq!(next.tcp_connector_limit, 200);
        assert!((next.tcp_keepalive_timeout - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_batch_leaves_original_untouched() {
        let settings = SystemSettings::default();
        let _ = settings.apply(&[
            SettingEntry::new("proxy_address", "10.0.0.1:3128"),
            SettingEntry::new("tcp_connector_limit", "lots"),
        ]);
        assert_eq!(settings, SystemSettings::default());
    }

    // -------------------------------------------------------------------------
    // Diff / Entries
    // -------------------------------------------------------------------------

    #[test]
    fn test_diff_lists_changed_keys() {
        let before = SystemSettings::default();
        let after = SystemSettings {
            api_key: "rotated".to_string(),
            tcp_connector_limit: 50,
            ..Default::default()
        };
        assert_eq!(
            before.diff(&after),
            vec![SettingKey::ApiKey, SettingKey::TcpConnectorLimit]
        );
    }

    #[test]
    fn test_entries_reapply_to_same_settings() {
        let custom = SystemSettings {
            log_level: LogLevel::Error,
            tcp_keepalive_timeout: 12.5,
            proxy_open: true,
            model_cache_size: 8,
            ..Default::default()
        };
        let reapplied = SystemSettings::default().apply(&custom.entries()).unwrap();
        assert_eq!(reapplied, custom);
    }
}
