#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Read-through market data cache for DCF valuation.
//!
//! This crate re-exports the core types, the cache stores and the provider
//! implementations, and provides a [`DataRouter`] that serves every request
//! from the store when possible and downloads (and stores) it otherwise.
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance provider for prices, statements and reference data
//! - `cache-sqlite` - SQLite-backed store
//!
//! # Example
//!
//! ```rust,ignore
//! use dcf_data::{DataConfig, DataRouter, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> dcf_data::Result<()> {
//!     let config = DataConfig::default().with_env_overrides()?;
//!     let router = DataRouter::from_config(&config)?
//!         .with_yahoo_provider(config.yahoo_provider());
//!
//!     let symbol = Symbol::new("AAPL");
//!     let prices = router.price_history(&symbol, None, None, true).await?;
//!     let info = router.company_info(&symbol, true).await?;
//!     println!("{} rows, beta {:?}", prices.len(), info.get_f64("beta"));
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use dcf_data_core::*;

// Stores and codecs
#[cfg(feature = "cache-sqlite")]
pub use dcf_data_store::SqliteStore;
pub use dcf_data_store::{
    Codec, DateColumnedCsv, FileStore, InMemoryStore, JsonDocument, NoopStore, RelationalCsv,
    TimeIndexedCsv,
};

// Providers
#[cfg(feature = "yahoo")]
pub use dcf_data_yahoo::YahooProvider;

pub mod config;
pub use config::{DataConfig, StoreBackend};

mod router;
pub use router::{DataRouter, Defaults, FetchOptions};
