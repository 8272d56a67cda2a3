#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cache stores and artifact codecs for the DCF market data cache.
//!
//! This crate provides implementations of the [`CacheStore`] trait from
//! `dcf-data-core`:
//!
//! - [`FileStore`] - One file per entry under a root directory (default)
//! - [`SqliteStore`] - Single-file SQLite blob store (requires `sqlite` feature)
//! - [`InMemoryStore`] - Simple in-memory store for testing
//! - [`NoopStore`] - No-op store that never hits and discards writes
//!
//! and the [`Codec`](codec::Codec)s that turn records into artifact bytes.

/// Record codecs (CSV and JSON).
pub mod codec;
/// File-per-entry store.
pub mod file;
/// In-memory store implementation.
pub mod memory;
/// No-op store implementation.
pub mod noop;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use dcf_data_core::CacheStore;

// Re-export implementations
pub use codec::{Codec, DateColumnedCsv, JsonDocument, RelationalCsv, TimeIndexedCsv};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use noop::NoopStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
