//! SQLite-based store implementation.

use chrono::Utc;
use dcf_data_core::{CacheKey, CacheStore, DataError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite-based store for cache artifacts.
///
/// Artifacts are kept as blobs in a single `cache_entries` table keyed by the
/// entry file name, so a whole cache fits in one database file. Each write is
/// a single `INSERT OR REPLACE`, which SQLite applies atomically.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    location: String,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DataError::Cache(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| DataError::Cache(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            location: PathBuf::from(path).display().to_string(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DataError::Cache(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                encoding TEXT NOT NULL,
                content BLOB NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

impl CacheStore for SqliteStore {
    fn exists(&self, key: &CacheKey) -> bool {
        let Ok(conn) = self.conn.lock() else {
            return false;
        };
        conn.query_row(
            "SELECT 1 FROM cache_entries WHERE key = ?1",
            params![key.file_name()],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .unwrap_or(false)
    }

    #[instrument(skip(self), fields(key = %key))]
    fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        let content: Option<Vec<u8>> = conn
            .query_row(
                "SELECT content FROM cache_entries WHERE key = ?1",
                params![key.file_name()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        content.ok_or_else(|| DataError::Cache(format!("{key} is not stored")))
    }

    #[instrument(skip(self, bytes), fields(key = %key, len = bytes.len()))]
    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, encoding, content, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                key.file_name(),
                key.encoding().extension(),
                bytes,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("Stored {} bytes", bytes.len());
        Ok(())
    }

    fn describe(&self, key: &CacheKey) -> String {
        format!("{}#{key}", self.location)
    }
}
