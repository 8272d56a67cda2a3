#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/dcf-data/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance data provider that implements the
//! [`PriceDataProvider`], [`FundamentalDataProvider`] and
//! [`ReferenceDataProvider`] traits from `dcf-data-core`.
//!
//! # Features
//!
//! - Daily price history from the chart API
//! - Annual and quarterly statements from the fundamentals-timeseries API
//! - Company info, holders and recommendations from the quoteSummary API
//! - Built-in rate limiting (1 request per second by default)
//!
//! # Example
//!
//! ```no_run
//! use dcf_data_yahoo::YahooProvider;
//! use dcf_data_core::{PriceDataProvider, Symbol};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> dcf_data_core::Result<()> {
//! let provider = YahooProvider::new();
//! let symbol = Symbol::new("AAPL");
//! let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
//!
//! let df = provider.fetch_price_history(&symbol, start, None).await?;
//! println!("Fetched {} rows", df.height());
//! # Ok(())
//! # }
//! ```

mod chart;
mod fundamentals;
mod response;
mod summary;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dcf_data_core::{
    DataError, DataProvider, FundamentalDataProvider, HolderKind, PeriodType, PriceDataProvider,
    ReferenceDataProvider, Result, StatementKind, Symbol,
};
use polars::prelude::DataFrame;
use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::chart::ChartResponse;

/// Default rate limit delay in milliseconds.
pub const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Yahoo Finance data provider.
///
/// Implements [`DataProvider`], [`PriceDataProvider`],
/// [`FundamentalDataProvider`] and [`ReferenceDataProvider`].
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    ///
    /// Uses the provided client for all HTTP requests. Rate limiting
    /// is still applied.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            rate_limit_ms: u64::try_from(rate_limit.as_millis()).unwrap_or(u64::MAX),
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Minimum delay between two requests.
    #[must_use]
    pub const fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now_millis().saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(now_millis(), Ordering::Relaxed);
    }

    /// GET a JSON document.
    ///
    /// Returns `None` on HTTP 404, which Yahoo uses for unknown symbols.
    async fn get_json(&self, url: &str, symbol: &Symbol) -> Result<Option<Value>> {
        self.apply_rate_limit().await;
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("No data for {}", symbol);
            return Ok(None);
        }

        if !status.is_success() {
            return Err(DataError::Network(format!("HTTP {} for {}", status, symbol)));
        }

        response
            .json::<Value>()
            .await
            .map(Some)
            .map_err(|e| DataError::Parse(e.to_string()))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Yahoo Finance data provider for prices, statements, company info and holders"
    }
}

#[async_trait]
impl PriceDataProvider for YahooProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_price_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<DataFrame> {
        if let Some(end) = end.filter(|end| *end < start) {
            return Err(DataError::InvalidParameter(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }

        let url = chart::chart_url(symbol, start, end, Utc::now());
        let Some(body) = self.get_json(&url, symbol).await? else {
            return Ok(DataFrame::empty());
        };

        let response: ChartResponse =
            serde_json::from_value(body).map_err(|e| DataError::Parse(e.to_string()))?;
        chart::parse_chart(response)
    }
}

#[async_trait]
impl FundamentalDataProvider for YahooProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        period: PeriodType,
        kind: StatementKind,
    ) -> Result<DataFrame> {
        let url = fundamentals::timeseries_url(symbol, period, kind, Utc::now());
        match self.get_json(&url, symbol).await? {
            Some(body) => fundamentals::parse_timeseries(&body, period, kind),
            None => Ok(DataFrame::empty()),
        }
    }
}

#[async_trait]
impl ReferenceDataProvider for YahooProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_company_info(&self, symbol: &Symbol) -> Result<Map<String, Value>> {
        let url = summary::quote_summary_url(symbol, summary::INFO_MODULES);
        match self.get_json(&url, symbol).await? {
            Some(body) => summary::parse_company_info(&body),
            None => Ok(Map::new()),
        }
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_holders(&self, symbol: &Symbol, kind: HolderKind) -> Result<DataFrame> {
        let url = summary::quote_summary_url(symbol, &[summary::holder_module(kind)]);
        match self.get_json(&url, symbol).await? {
            Some(body) => summary::parse_holders(&body, kind),
            None => Ok(DataFrame::empty()),
        }
    }
}
