//! Database migrations for modelmux.
//!
//! Simple migration system that tracks applied migrations and runs each only once.

use rusqlite::Connection;

/// SQL for the providers and models tables.
const MIGRATION_001_PROVIDERS_MODELS: &str = r#"
-- Providers table (upstream API endpoint + credentials)
CREATE TABLE IF NOT EXISTS providers (
    id TEXT PRIMARY KEY,
    provider_name TEXT NOT NULL UNIQUE,
    api_key TEXT NOT NULL DEFAULT '',
    api_base_url TEXT NOT NULL,
    api_request_address TEXT NOT NULL,
    provider_format TEXT NOT NULL CHECK (provider_format IN ('openai', 'deepseek', 'anthropic', 'google')),
    is_proxy_open INTEGER NOT NULL DEFAULT 0,
    is_valid INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (unixepoch()),
    updated_at INTEGER NOT NULL DEFAULT (unixepoch())
);

-- Models table (reasoner and general models, each bound to one provider)
CREATE TABLE IF NOT EXISTS models (
    id TEXT PRIMARY KEY,
    model_name TEXT NOT NULL,
    model_id TEXT NOT NULL,
    provider_id TEXT NOT NULL,
    model_type TEXT NOT NULL CHECK (model_type IN ('reasoner', 'general')),
    model_format TEXT NOT NULL CHECK (model_format IN ('openai', 'deepseek', 'anthropic')),
    model_custom_json TEXT,  -- compact JSON object, NULL when absent
    is_origin_reasoning INTEGER NOT NULL DEFAULT 0,
    is_origin_output INTEGER NOT NULL DEFAULT 0,
    is_valid INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (unixepoch()),
    updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
    UNIQUE (model_type, model_name),
    FOREIGN KEY (provider_id) REFERENCES providers(id)
);

CREATE INDEX IF NOT EXISTS idx_models_provider ON models(provider_id);
"#;

/// SQL for the composite models table.
const MIGRATION_002_COMPOSITE_MODELS: &str = r#"
-- Composite models (one reasoner model paired with one general model)
CREATE TABLE IF NOT EXISTS composite_models (
    id TEXT PRIMARY KEY,
    model_name TEXT NOT NULL UNIQUE,
    reasoner_model_id TEXT NOT NULL,
    general_model_id TEXT NOT NULL,
    is_valid INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (unixepoch()),
    updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
    FOREIGN KEY (reasoner_model_id) REFERENCES models(id),
    FOREIGN KEY (general_model_id) REFERENCES models(id)
);

CREATE INDEX IF NOT EXISTS idx_composite_reasoner ON composite_models(reasoner_model_id);
CREATE INDEX IF NOT EXISTS idx_composite_general ON composite_models(general_model_id);
"#;

/// SQL for the system settings table.
const MIGRATION_003_SYSTEM_SETTINGS: &str = r#"
-- System settings (typed scalar per key)
CREATE TABLE IF NOT EXISTS system_settings (
    setting_key TEXT PRIMARY KEY,
    setting_value TEXT NOT NULL,
    setting_type TEXT NOT NULL CHECK (setting_type IN ('str', 'int', 'float', 'bool')),
    updated_at INTEGER NOT NULL DEFAULT (unixepoch())
);
"#;

/// All migrations in order. Each is (name, sql).
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_providers_models", MIGRATION_001_PROVIDERS_MODELS),
    ("002_composite_models", MIGRATION_002_COMPOSITE_MODELS),
    ("003_system_settings", MIGRATION_003_SYSTEM_SETTINGS),
];

/// Run all pending migrations.
///
/// Creates the migrations tracking table if needed, then applies any migrations
/// that haven't been run yet.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch())
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let applied: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
            [name],
            |row| row.get(0),
        )?;

        if !applied {
            tracing::info!(migration = %name, "Running migration");
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
            tracing::info!(migration = %name, "Migration complete");
        }
    }

    Ok(())
}
