//! Store trait for persisted cache artifacts.
//!
//! This module defines the [`CacheStore`] trait, a minimal byte-level store
//! keyed by [`CacheKey`]. Stores know nothing about record shapes; encoding is
//! the job of a codec.

use std::fmt::Debug;

use crate::{error::Result, key::CacheKey};

/// Trait for persisting encoded cache artifacts.
///
/// Implementations can store artifacts in various backends (a directory of
/// files, SQLite, in-memory, etc.). Calls are blocking; a store is expected to
/// answer from local storage only.
pub trait CacheStore: Send + Sync + Debug {
    /// Returns true if an artifact is stored under `key`.
    ///
    /// I/O failures while probing are reported as a miss.
    fn exists(&self, key: &CacheKey) -> bool;

    /// Reads the artifact stored under `key`.
    ///
    /// # Errors
    /// Returns [`DataError::Cache`](crate::DataError::Cache) if the artifact is
    /// missing or unreadable.
    fn read(&self, key: &CacheKey) -> Result<Vec<u8>>;

    /// Stores `bytes` under `key`, replacing any previous artifact.
    ///
    /// A concurrent reader observes either the previous artifact or the new
    /// one, never a partial write.
    ///
    /// # Errors
    /// Returns [`DataError::Cache`](crate::DataError::Cache) if the write fails.
    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<()>;

    /// Human-readable location of an artifact, used in log messages.
    fn describe(&self, key: &CacheKey) -> String {
        key.file_name()
    }
}
