//! No-op store implementation.

use dcf_data_core::{CacheKey, CacheStore, DataError, Result};
use tracing::trace;

/// A no-op store that doesn't persist anything.
///
/// Every lookup is a miss and every write succeeds without storing. Plugging
/// it into a router disables persistence entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl NoopStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CacheStore for NoopStore {
    fn exists(&self, _key: &CacheKey) -> bool {
        false
    }

    fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        Err(DataError::Cache(format!("{key} is not stored (no-op store)")))
    }

    fn write(&self, key: &CacheKey, _bytes: &[u8]) -> Result<()> {
        trace!(%key, "NoopStore: write discarded");
        Ok(())
    }

    fn describe(&self, key: &CacheKey) -> String {
        format!("noop:{key}")
    }
}
