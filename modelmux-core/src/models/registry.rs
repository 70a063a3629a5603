//! Model registry backed by the `models` table.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{ConfigError, EntityKind};
use crate::hooks::IdGenerator;
use crate::validation::{validate_model, ConfigIndex, CustomJson};

use super::config::{Model, ModelDraft, ValidModels};
use super::types::ModelType;

const SELECT_MODEL: &str = "SELECT id, model_name, model_id, provider_id, model_type, model_format,
        model_custom_json, is_origin_reasoning, is_origin_output, is_valid
 FROM models";

fn row_to_model(row: &Row<'_>) -> rusqlite::Result<Model> {
    let custom_json = row
        .get::<_, Option<String>>(6)?
        .map(|text| CustomJson::parse(&text))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(Model {
        id: row.get(0)?,
        model_name: row.get(1)?,
        model_id: row.get(2)?,
        provider_id: row.get(3)?,
        model_type: row.get(4)?,
        model_format: row.get(5)?,
        model_custom_json: custom_json,
        is_origin_reasoning: row.get(7)?,
        is_origin_output: row.get(8)?,
        is_valid: row.get(9)?,
    })
}

/// Read/write access to stored reasoner and general models.
#[derive(Debug, Clone, Copy)]
pub struct ModelRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> ModelRegistry<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All models, reasoners first, then by name.
    pub fn list(&self) -> Result<Vec<Model>, ConfigError> {
        self.query(
            &format!("{SELECT_MODEL} ORDER BY model_type DESC, model_name"),
            [],
        )
    }

    pub fn list_by_type(&self, model_type: ModelType) -> Result<Vec<Model>, ConfigError> {
        self.query(
            &format!("{SELECT_MODEL} WHERE model_type = ? ORDER BY model_name"),
            [model_type],
        )
    }

    /// Valid models split into reasoner and general lists.
    pub fn get_valid_grouped_by_type(&self) -> Result<ValidModels, ConfigError> {
        let models = self.query(
            &format!("{SELECT_MODEL} WHERE is_valid = 1 ORDER BY model_name"),
            [],
        )?;

        let (reasoner, general) = models
            .into_iter()
            .partition(|m| m.model_type == ModelType::Reasoner);
        Ok(ValidModels { reasoner, general })
    }

    pub fn get(&self, id: &str) -> Result<Option<Model>, ConfigError> {
        let model = self
            .conn
            .query_row(&format!("{SELECT_MODEL} WHERE id = ?"), [id], row_to_model)
            .optional()?;
        Ok(model)
    }

    pub fn get_by_name(
        &self,
        model_type: ModelType,
        name: &str,
    ) -> Result<Option<Model>, ConfigError> {
        let model = self
            .conn
            .query_row(
                &format!("{SELECT_MODEL} WHERE model_type = ? AND model_name = ?"),
                params![model_type, name.trim()],
                row_to_model,
            )
            .optional()?;
        Ok(model)
    }

    pub fn exists(&self, id: &str) -> Result<bool, ConfigError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM models WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Number of models bound to a provider.
    pub fn count_by_provider(&self, provider_id: &str) -> Result<usize, ConfigError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM models WHERE provider_id = ?",
            [provider_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Validate and store a model.
    ///
    /// The provider reference, enum fields, custom JSON and per-type name
    /// uniqueness are all checked before anything is written.
    pub fn save(&self, draft: &ModelDraft, ids: &dyn IdGenerator) -> Result<Model, ConfigError> {
        let existing = match draft.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                if !self.exists(id)? {
                    return Err(ConfigError::not_found(EntityKind::Model, id));
                }
                Some(id.to_string())
            }
            _ => None,
        };
        let is_update = existing.is_some();
        let id = existing.unwrap_or_else(|| ids.next_id());

        let index = ConfigIndex::load(self.conn)?;
        let model = validate_model(&id, draft, &index)?;

        if is_update {
            self.update(&model)?;
        } else {
            self.insert(&model)?;
        }

        debug!(
            model = %model.model_name,
            model_type = %model.model_type,
            id = %model.id,
            updated = is_update,
            "Saved model"
        );
        Ok(model)
    }

    pub(crate) fn insert(&self, model: &Model) -> Result<(), ConfigError> {
        self.conn.execute(
            "INSERT INTO models (id, model_name, model_id, provider_id, model_type,
                model_format, model_custom_json, is_origin_reasoning, is_origin_output, is_valid)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &model.id,
                &model.model_name,
                &model.model_id,
                &model.provider_id,
                model.model_type,
                model.model_format,
                model.model_custom_json.as_ref().map(CustomJson::to_json_string),
                model.is_origin_reasoning,
                model.is_origin_output,
                model.is_valid,
            ],
        )?;
        Ok(())
    }

    fn update(&self, model: &Model) -> Result<(), ConfigError> {
        self.conn.execute(
            "UPDATE models SET model_name = ?, model_id = ?, provider_id = ?, model_type = ?,
                model_format = ?, model_custom_json = ?, is_origin_reasoning = ?,
                is_origin_output = ?, is_valid = ?, updated_at = unixepoch()
             WHERE id = ?",
            params![
                &model.model_name,
                &model.model_id,
                &model.provider_id,
                model.model_type,
                model.model_format,
                model.model_custom_json.as_ref().map(CustomJson::to_json_string),
                model.is_origin_reasoning,
                model.is_origin_output,
                model.is_valid,
                &model.id,
            ],
        )?;
        Ok(())
    }

    /// Delete a model row. Returns whether a row was removed.
    ///
    /// Callers must check for referencing composites first.
    pub(crate) fn remove(&self, id: &str) -> Result<bool, ConfigError> {
        let removed = self.conn.execute("DELETE FROM models WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    pub(crate) fn clear(&self) -> Result<usize, ConfigError> {
        Ok(self.conn.execute("DELETE FROM models", [])?)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Model>, ConfigError> {
        let mut stmt = self.conn.prepare(sql)?;
        let models = stmt
            .query_map(params, row_to_model)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = models.len(), "Loaded models");
        Ok(models)
    }
}
