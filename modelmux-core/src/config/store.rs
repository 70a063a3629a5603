//! Settings store backed by the `system_settings` table.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ConfigError;

use super::settings::{SettingKey, SystemSettings};
use super::values::{SettingEntry, SettingType, SettingValue};

/// Outcome of a settings update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsChange {
    /// Keys whose stored value actually changed
    pub changed_keys: Vec<SettingKey>,
    /// Existing sessions must be dropped (the router key changed)
    pub credentials_rotated: bool,
}

impl SettingsChange {
    pub fn is_empty(&self) -> bool {
        self.changed_keys.is_empty()
    }
}

/// Read/write access to system settings.
///
/// Writes issue one statement per changed key; run them inside a
/// transaction to make a batch atomic.
#[derive(Debug, Clone, Copy)]
pub struct SettingsStore<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load all settings, using defaults for missing values.
    ///
    /// A row that can't be parsed is logged and replaced by its default.
    pub fn get_all(&self) -> Result<SystemSettings, ConfigError> {
        let mut settings = SystemSettings::default();

        let mut stmt = self
            .conn
            .prepare("SELECT setting_key, setting_value FROM system_settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        for (raw_key, text) in rows {
            let Ok(key) = raw_key.parse::<SettingKey>() else {
                warn!(key = %raw_key, "Ignoring unknown setting row");
                continue;
            };
            let applied = SettingValue::parse_text(key.setting_type(), &text)
                .and_then(|value| settings.set(key, value));
            if let Err(e) = applied {
                warn!(key = %key, error = %e, "Failed to parse setting, using default");
            }
        }

        Ok(settings)
    }

    pub fn get(&self, key: SettingKey) -> Result<SettingValue, ConfigError> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT setting_value FROM system_settings WHERE setting_key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let mut settings = SystemSettings::default();
        if let Some(text) = text {
            let applied = SettingValue::parse_text(key.setting_type(), &text)
                .and_then(|value| settings.set(key, value));
            if let Err(e) = applied {
                warn!(key = %key, error = %e, "Failed to parse setting, using default");
            }
        }
        Ok(settings.get(key))
    }

    /// Validate a batch against the current settings, then write it.
    ///
    /// Nothing is written unless every entry is valid and the merged
    /// settings satisfy the connection-pool rule.
    pub fn update(&self, entries: &[SettingEntry]) -> Result<SettingsChange, ConfigError> {
        let current = self.get_all()?;
        let next = current.apply(entries)?;
        let changed_keys = current.diff(&next);

        for key in &changed_keys {
            self.write(*key, &next.get(*key))?;
        }

        debug!(changed = ?changed_keys, "Updated settings");
        Ok(SettingsChange {
            credentials_rotated: changed_keys.contains(&SettingKey::ApiKey),
            changed_keys,
        })
    }

    pub fn set_log_level(&self, level: &str) -> Result<SettingsChange, ConfigError> {
        self.update(&[SettingEntry::new(SettingKey::LogLevel.as_str(), level)])
    }

    /// Replace the router key. Always signals rotation, even if unchanged.
    pub fn set_api_key(&self, api_key: &str) -> Result<SettingsChange, ConfigError> {
        let mut change = self.update(&[SettingEntry::new(SettingKey::ApiKey.as_str(), api_key)])?;
        change.credentials_rotated = true;
        Ok(change)
    }

    /// Set all three connection-pool values as one batch.
    pub fn set_connection_limits(
        &self,
        limit: i64,
        per_host: i64,
        keepalive_timeout: f64,
    ) -> Result<SettingsChange, ConfigError> {
        self.update(&[
            SettingEntry::typed(SettingKey::TcpConnectorLimit.as_str(), limit, SettingType::Int),
            SettingEntry::typed(
                SettingKey::TcpConnectorLimitPerHost.as_str(),
                per_host,
                SettingType::Int,
            ),
            SettingEntry::typed(
                SettingKey::TcpKeepaliveTimeout.as_str(),
                keepalive_timeout,
                SettingType::Float,
            ),
        ])
    }

    /// Write every key of `settings`, replacing whatever is stored.
    pub(crate) fn replace_all(&self, settings: &SystemSettings) -> Result<(), ConfigError> {
        for key in SettingKey::ALL {
            self.write(key, &settings.get(key))?;
        }
        Ok(())
    }

    pub(crate) fn clear(&self) -> Result<usize, ConfigError> {
        Ok(self.conn.execute("DELETE FROM system_settings", [])?)
    }

    fn write(&self, key: SettingKey, value: &SettingValue) -> Result<(), ConfigError> {
        self.conn.execute(
            "INSERT INTO system_settings (setting_key, setting_value, setting_type, updated_at)
             VALUES (?, ?, ?, unixepoch())
             ON CONFLICT(setting_key) DO UPDATE SET
                setting_value = excluded.setting_value,
                setting_type = excluded.setting_type,
                updated_at = unixepoch()",
            params![key.as_str(), value.to_text(), key.setting_type()],
        )?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
