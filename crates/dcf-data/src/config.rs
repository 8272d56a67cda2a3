//! Cache and router configuration.
//!
//! [`DataConfig`] is read from TOML and can be overridden from the
//! environment. Every field has a default, so an empty file is valid:
//!
//! ```toml
//! cache_dir = "data/raw"
//! backend = "file"          # file | sqlite | memory | none
//! use_cache = true
//! price_start = "2023-01-01"
//! risk_free_symbol = "^TNX"
//! risk_free_start = "2019-01-01"
//! yahoo_rate_limit_ms = 1000
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use dcf_data_core::{CacheStore, DataError, Result, Symbol};
use dcf_data_store::{FileStore, InMemoryStore, NoopStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable overriding [`DataConfig::cache_dir`].
pub const ENV_CACHE_DIR: &str = "DCF_DATA_CACHE_DIR";
/// Environment variable overriding [`DataConfig::backend`].
pub const ENV_BACKEND: &str = "DCF_DATA_BACKEND";
/// Environment variable overriding [`DataConfig::use_cache`].
pub const ENV_USE_CACHE: &str = "DCF_DATA_USE_CACHE";

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "data/raw";
/// Default identifier of the risk-free rate series.
pub const DEFAULT_RISK_FREE_SYMBOL: &str = "^TNX";

/// Default first day of price history requests.
#[must_use]
pub fn default_price_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// Default first day of risk-free rate requests.
#[must_use]
pub fn default_risk_free_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default()
}

/// Storage backend for cache artifacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One file per entry under `cache_dir`.
    #[default]
    File,
    /// Single SQLite database file.
    Sqlite,
    /// Process memory; nothing survives a restart.
    Memory,
    /// No persistence at all.
    None,
}

impl StoreBackend {
    /// Returns the lowercase name of this backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
            Self::None => "none",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            "none" | "noop" => Ok(Self::None),
            other => Err(DataError::Config(format!("unknown store backend: {other}"))),
        }
    }
}

/// Configuration of the cache and its defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding cache artifacts.
    pub cache_dir: PathBuf,
    /// Storage backend.
    pub backend: StoreBackend,
    /// SQLite database path; defaults to `<cache_dir>/cache.sqlite`.
    pub sqlite_path: Option<PathBuf>,
    /// Whether lookups consult the cache by default.
    pub use_cache: bool,
    /// Default first day of price history requests.
    pub price_start: NaiveDate,
    /// Identifier of the risk-free rate series.
    pub risk_free_symbol: Symbol,
    /// Default first day of risk-free rate requests.
    pub risk_free_start: NaiveDate,
    /// Minimum delay between two Yahoo Finance requests, in milliseconds.
    pub yahoo_rate_limit_ms: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            backend: StoreBackend::File,
            sqlite_path: None,
            use_cache: true,
            price_start: default_price_start(),
            risk_free_symbol: Symbol::new(DEFAULT_RISK_FREE_SYMBOL),
            risk_free_start: default_risk_free_start(),
            yahoo_rate_limit_ms: 1000,
        }
    }
}

impl DataConfig {
    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`DataError::Config`] if the TOML is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DataError::Config(format!("parse config TOML: {e}")))
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    /// Returns [`DataError::Config`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Apply `DCF_DATA_*` environment overrides.
    ///
    /// # Errors
    /// Returns [`DataError::Config`] if an override has an invalid value.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            debug!(cache_dir = %dir, "Overriding cache directory from environment");
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.backend = backend.parse()?;
        }
        if let Some(use_cache) = lookup(ENV_USE_CACHE) {
            self.use_cache = parse_bool(&use_cache)
                .ok_or_else(|| DataError::Config(format!("{ENV_USE_CACHE}: {use_cache}")))?;
        }
        Ok(self)
    }

    /// Path of the SQLite database used by the `sqlite` backend.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.cache_dir.join("cache.sqlite"))
    }

    /// Open the configured store.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened, or
    /// [`DataError::Config`] if the backend is not compiled in.
    pub fn open_store(&self) -> Result<Arc<dyn CacheStore>> {
        debug!(backend = %self.backend, "Opening cache store");
        match self.backend {
            StoreBackend::File => Ok(Arc::new(FileStore::new(&self.cache_dir)?)),
            #[cfg(feature = "cache-sqlite")]
            StoreBackend::Sqlite => Ok(Arc::new(dcf_data_store::SqliteStore::new(
                self.sqlite_path(),
            )?)),
            #[cfg(not(feature = "cache-sqlite"))]
            StoreBackend::Sqlite => Err(DataError::Config(
                "sqlite backend requires the `cache-sqlite` feature".to_string(),
            )),
            StoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
            StoreBackend::None => Ok(Arc::new(NoopStore::new())),
        }
    }

    /// Build a Yahoo Finance provider with the configured rate limit.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn yahoo_provider(&self) -> dcf_data_yahoo::YahooProvider {
        dcf_data_yahoo::YahooProvider::with_rate_limit(std::time::Duration::from_millis(
            self.yahoo_rate_limit_ms,
        ))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
