#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the DCF market data cache.
//!
//! This crate provides the foundational abstractions shared by stores,
//! providers and the router:
//!
//! - [`DataProvider`](provider::DataProvider) - Base trait for all providers
//! - [`PriceDataProvider`](provider::PriceDataProvider) - Daily price history
//! - [`FundamentalDataProvider`](provider::FundamentalDataProvider) - Financial statements
//! - [`ReferenceDataProvider`](provider::ReferenceDataProvider) - Company info and holders
//! - [`CacheStore`](cache::CacheStore) - Byte-level artifact store
//! - [`CacheKey`](key::CacheKey) - Artifact naming scheme
//! - [`Record`](record::Record) - Typed cache payloads

/// Store trait for persisted cache artifacts.
pub mod cache;
/// Error types for data operations.
pub mod error;
/// Cache keys and artifact naming.
pub mod key;
/// Data kind, period and sub-kind definitions.
pub mod kind;
/// Provider traits for fetching market data.
pub mod provider;
/// Record types (price series, statements, holders, company info).
pub mod record;
/// Core value types (Symbol, date column helpers).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::CacheStore;
pub use error::{DataError, Result};
pub use key::{CacheKey, Encoding};
pub use kind::{DataKind, HolderKind, PeriodType, StatementKind, SubKind};
pub use provider::{
    DataProvider, FundamentalDataProvider, PriceDataProvider, ReferenceDataProvider,
};
pub use record::{
    CacheableRecord, ColumnHeaders, CompanyInfo, HolderBundle, PriceSeries, Record,
    RelationalTable, StatementBundle, StatementTable,
};
pub use types::Symbol;
