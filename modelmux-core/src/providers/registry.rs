//! Provider registry backed by the `providers` table.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{ConfigError, EntityKind};
use crate::hooks::IdGenerator;
use crate::validation::{validate_provider, ConfigIndex};

use super::config::{Provider, ProviderDraft};

const SELECT_PROVIDER: &str = "SELECT id, provider_name, api_key, api_base_url, api_request_address,
        provider_format, is_proxy_open, is_valid
 FROM providers";

fn row_to_provider(row: &Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: row.get(0)?,
        provider_name: row.get(1)?,
        api_key: row.get(2)?,
        api_base_url: row.get(3)?,
        api_request_address: row.get(4)?,
        provider_format: row.get(5)?,
        is_proxy_open: row.get(6)?,
        is_valid: row.get(7)?,
    })
}

/// Read/write access to stored providers.
///
/// Borrows a connection (or an open transaction) for the duration of one
/// operation; holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> ProviderRegistry<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All providers, ordered by name.
    pub fn list(&self) -> Result<Vec<Provider>, ConfigError> {
        self.query(&format!("{SELECT_PROVIDER} ORDER BY provider_name"))
    }

    /// Providers marked valid, ordered by name.
    pub fn get_valid(&self) -> Result<Vec<Provider>, ConfigError> {
        self.query(&format!(
            "{SELECT_PROVIDER} WHERE is_valid = 1 ORDER BY provider_name"
        ))
    }

    pub fn get(&self, id: &str) -> Result<Option<Provider>, ConfigError> {
        let provider = self
            .conn
            .query_row(
                &format!("{SELECT_PROVIDER} WHERE id = ?"),
                [id],
                row_to_provider,
            )
            .optional()?;
        Ok(provider)
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<Provider>, ConfigError> {
        let provider = self
            .conn
            .query_row(
                &format!("{SELECT_PROVIDER} WHERE provider_name = ?"),
                [name.trim()],
                row_to_provider,
            )
            .optional()?;
        Ok(provider)
    }

    pub fn exists(&self, id: &str) -> Result<bool, ConfigError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM providers WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Validate and store a provider.
    ///
    /// Inserts with a fresh id when `draft.id` is absent, otherwise updates
    /// the existing record (`NotFound` if there is none).
    pub fn save(
        &self,
        draft: &ProviderDraft,
        ids: &dyn IdGenerator,
    ) -> Result<Provider, ConfigError> {
        let existing = match draft.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                if !self.exists(id)? {
                    return Err(ConfigError::not_found(EntityKind::Provider, id));
                }
                Some(id.to_string())
            }
            _ => None,
        };
        let is_update = existing.is_some();
        let id = existing.unwrap_or_else(|| ids.next_id());

        let index = ConfigIndex::load(self.conn)?;
        let provider = validate_provider(&id, draft, &index)?;

        if is_update {
            self.update(&provider)?;
        } else {
            self.insert(&provider)?;
        }

        debug!(
            provider = %provider.provider_name,
            id = %provider.id,
            updated = is_update,
            "Saved provider"
        );
        Ok(provider)
    }

    pub(crate) fn insert(&self, provider: &Provider) -> Result<(), ConfigError> {
        self.conn.execute(
            "INSERT INTO providers (id, provider_name, api_key, api_base_url,
                api_request_address, provider_format, is_proxy_open, is_valid)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &provider.id,
                &provider.provider_name,
                &provider.api_key,
                &provider.api_base_url,
                &provider.api_request_address,
                provider.provider_format,
                provider.is_proxy_open,
                provider.is_valid,
            ],
        )?;
        Ok(())
    }

    fn update(&self, provider: &Provider) -> Result<(), ConfigError> {
        self.conn.execute(
            "UPDATE providers SET provider_name = ?, api_key = ?, api_base_url = ?,
                api_request_address = ?, provider_format = ?, is_proxy_open = ?,
                is_valid = ?, updated_at = unixepoch()
             WHERE id = ?",
            params![
                &provider.provider_name,
                &provider.api_key,
                &provider.api_base_url,
                &provider.api_request_address,
                provider.provider_format,
                provider.is_proxy_open,
                provider.is_valid,
                &provider.id,
            ],
        )?;
        Ok(())
    }

    /// Delete a provider row. Returns whether a row was removed.
    ///
    /// Callers must check for referencing models first.
    pub(crate) fn remove(&self, id: &str) -> Result<bool, ConfigError> {
        let removed = self
            .conn
            .execute("DELETE FROM providers WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    pub(crate) fn clear(&self) -> Result<usize, ConfigError> {
        Ok(self.conn.execute("DELETE FROM providers", [])?)
    }

    fn query(&self, sql: &str) -> Result<Vec<Provider>, ConfigError> {
        let mut stmt = self.conn.prepare(sql)?;
        let providers = stmt
            .query_map([], row_to_provider)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = providers.len(), "Loaded providers");
        Ok(providers)
    }
}
