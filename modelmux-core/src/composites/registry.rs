//! Composite registry backed by the `composite_models` table.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{ConfigError, EntityKind};
use crate::hooks::IdGenerator;
use crate::validation::{validate_composite, ConfigIndex};

use super::{CompositeDraft, CompositeModel};

const SELECT_COMPOSITE: &str =
    "SELECT id, model_name, reasoner_model_id, general_model_id, is_valid FROM composite_models";

fn row_to_composite(row: &Row<'_>) -> rusqlite::Result<CompositeModel> {
    Ok(CompositeModel {
        id: row.get(0)?,
        model_name: row.get(1)?,
        reasoner_model_id: row.get(2)?,
        general_model_id: row.get(3)?,
        is_valid: row.get(4)?,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct CompositeRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> CompositeRegistry<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn list(&self) -> Result<Vec<CompositeModel>, ConfigError> {
        self.query(&format!("{SELECT_COMPOSITE} ORDER BY model_name"), [])
    }

    pub fn get_valid(&self) -> Result<Vec<CompositeModel>, ConfigError> {
        self.query(
            &format!("{SELECT_COMPOSITE} WHERE is_valid = 1 ORDER BY model_name"),
            [],
        )
    }

    pub fn get(&self, id: &str) -> Result<Option<CompositeModel>, ConfigError> {
        let composite = self
            .conn
            .query_row(
                &format!("{SELECT_COMPOSITE} WHERE id = ?"),
                [id],
                row_to_composite,
            )
            .optional()?;
        Ok(composite)
    }

    pub fn exists(&self, id: &str) -> Result<bool, ConfigError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM composite_models WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Composites that use the given model on either side.
    pub fn referencing(&self, model_id: &str) -> Result<Vec<CompositeModel>, ConfigError> {
        self.query(
            &format!(
                "{SELECT_COMPOSITE} WHERE reasoner_model_id = ?1 OR general_model_id = ?1
                 ORDER BY model_name"
            ),
            [model_id],
        )
    }

    /// Validate and store a composite.
    ///
    /// Both references must name an existing model of the matching type.
    pub fn save(
        &self,
        draft: &CompositeDraft,
        ids: &dyn IdGenerator,
    ) -> Result<CompositeModel, ConfigError> {
        let existing = match draft.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                if !self.exists(id)? {
                    return Err(ConfigError::not_found(EntityKind::CompositeModel, id));
                }
                Some(id.to_string())
            }
            _ => None,
        };
        let is_update = existing.is_some();
        let id = existing.unwrap_or_else(|| ids.next_id());

        let index = ConfigIndex::load(self.conn)?;
        let composite = validate_composite(&id, draft, &index)?;

        if is_update {
            self.conn.execute(
                "UPDATE composite_models SET model_name = ?, reasoner_model_id = ?,
                    general_model_id = ?, is_valid = ?, updated_at = unixepoch()
                 WHERE id = ?",
                params![
                    &composite.model_name,
                    &composite.reasoner_model_id,
                    &composite.general_model_id,
                    composite.is_valid,
                    &composite.id,
                ],
            )?;
        } else {
            self.insert(&composite)?;
        }

        debug!(
            composite = %composite.model_name,
            id = %composite.id,
            updated = is_update,
            "Saved composite model"
        );
        Ok(composite)
    }

    pub(crate) fn insert(&self, composite: &CompositeModel) -> Result<(), ConfigError> {
        self.conn.execute(
            "INSERT INTO composite_models (id, model_name, reasoner_model_id, general_model_id, is_valid)
             VALUES (?, ?, ?, ?, ?)",
            params![
                &composite.id,
                &composite.model_name,
                &composite.reasoner_model_id,
                &composite.general_model_id,
                composite.is_valid,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn remove(&self, id: &str) -> Result<bool, ConfigError> {
        let removed = self
            .conn
            .execute("DELETE FROM composite_models WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    pub(crate) fn clear(&self) -> Result<usize, ConfigError> {
        Ok(self.conn.execute("DELETE FROM composite_models", [])?)
    }

    fn query<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<CompositeModel>, ConfigError> {
        let mut stmt = self.conn.prepare(sql)?;
        let composites = stmt
            .query_map(params, row_to_composite)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(composites)
    }
}
