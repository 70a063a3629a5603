//! SQLite database layer for modelmux.
//!
//! Provides persistent storage for:
//! - Providers (upstream API endpoints and credentials)
//! - Models and composite models
//! - System settings (typed key/value rows)

mod migrations;

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Store a string-valued enum as TEXT.
///
/// The type must provide `as_str()` and `FromStr` with an error that
/// implements `std::error::Error + Send + Sync`.
macro_rules! impl_sql_text {
    ($ty:ty) => {
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub(crate) use impl_sql_text;

/// How long a writer waits on a lock held by another process before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
///
/// Provides a high-level API for interacting with the SQLite database.
/// Automatically handles connection setup, migrations, and file permissions.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Default path: `~/.local/share/modelmux/modelmux.db`
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    /// Open the database at a specific path.
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 0600 on Unix (provider API keys live here).
    pub fn open_at(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(path = %path.display(), error = %e, "Failed to set database file permissions");
            }
        }

        Self::configure(conn, path)
    }

    /// Open a private in-memory database. Nothing survives the drop.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn, PathBuf::from(":memory:"))
    }

    fn configure(conn: Connection, path: PathBuf) -> anyhow::Result<Self> {
        // Model -> provider and composite -> model references are foreign keys
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn, path })
    }

    /// Get the default database path.
    ///
    /// Returns `~/.local/share/modelmux/modelmux.db` (or platform equivalent).
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("modelmux").join("modelmux.db"))
    }

    /// Run database migrations.
    ///
    /// Safe to call multiple times - migrations are tracked and only run once.
    pub fn migrate(&self) -> anyhow::Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get a reference to the underlying connection.
    ///
    /// Use sparingly - prefer the registries when possible.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get the database file path (`:memory:` for in-memory databases).
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Begin a write transaction.
    ///
    /// Uses `BEGIN IMMEDIATE` so the write lock is taken up front. A check
    /// made inside the transaction still holds when it commits.
    pub fn write_transaction(&mut self) -> Result<Transaction<'_>, rusqlite::Error> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
    }

    /// Begin a read transaction so several queries see one snapshot.
    pub fn read_transaction(&mut self) -> Result<Transaction<'_>, rusqlite::Error> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
    }

    /// Close the connection, reporting any error instead of ignoring it on drop.
    pub fn close(self) -> Result<(), rusqlite::Error> {
        self.conn.close().map_err(|(_, e)| e)
    }
}

// =============================================================================
// Tests
// =============================================================================
