//! In-memory store implementation.

use dcf_data_core::{CacheKey, CacheStore, DataError, Result};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory store for testing and ephemeral use.
///
/// Artifacts are kept in a `RwLock`-protected `HashMap` keyed by file name and
/// are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if an artifact with the given file name is stored.
    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(file_name))
            .unwrap_or(false)
    }
}

impl CacheStore for InMemoryStore {
    fn exists(&self, key: &CacheKey) -> bool {
        self.contains(&key.file_name())
    }

    #[instrument(skip(self), fields(key = %key))]
    fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DataError::Cache(e.to_string()))?;
        match entries.get(&key.file_name()) {
            Some(bytes) => {
                debug!("Cache hit for {key}");
                Ok(bytes.clone())
            }
            None => Err(DataError::Cache(format!("{key} is not stored"))),
        }
    }

    #[instrument(skip(self, bytes), fields(key = %key, len = bytes.len()))]
    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DataError::Cache(e.to_string()))?;
        entries.insert(key.file_name(), bytes.to_vec());
        debug!("Stored {} bytes", bytes.len());
        Ok(())
    }

    fn describe(&self, key: &CacheKey) -> String {
        format!("memory:{key}")
    }
}
