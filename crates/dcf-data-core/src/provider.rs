//! Provider traits for fetching market data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`PriceDataProvider`] - Daily OHLCV price history
//! - [`FundamentalDataProvider`] - Annual and quarterly financial statements
//! - [`ReferenceDataProvider`] - Company metadata, holders and recommendations
//!
//! Providers return raw frames and documents. An empty result means "no data"
//! and is not an error.

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::{
    error::Result,
    kind::{HolderKind, PeriodType, StatementKind},
    types::Symbol,
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for daily price history.
#[async_trait]
pub trait PriceDataProvider: DataProvider {
    /// Fetches daily OHLCV bars for a symbol.
    ///
    /// Returns a DataFrame with a `Date` column followed by `Open`, `High`,
    /// `Low`, `Close`, `Adj Close` and `Volume`. Columns may carry a second
    /// header level as `Field|Ticker`. `end = None` means "up to the latest
    /// available bar".
    async fn fetch_price_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<DataFrame>;
}

/// Provider for fundamental financial data.
#[async_trait]
pub trait FundamentalDataProvider: DataProvider {
    /// Fetches one financial statement for a symbol.
    ///
    /// Returns a DataFrame whose first column holds line-item labels and whose
    /// other columns are report dates, most recent first.
    async fn fetch_statement(
        &self,
        symbol: &Symbol,
        period: PeriodType,
        kind: StatementKind,
    ) -> Result<DataFrame>;
}

/// Provider for reference data.
#[async_trait]
pub trait ReferenceDataProvider: DataProvider {
    /// Fetches the flat company metadata mapping for a symbol.
    async fn fetch_company_info(&self, symbol: &Symbol) -> Result<Map<String, Value>>;

    /// Fetches one holders/recommendations table for a symbol.
    async fn fetch_holders(&self, symbol: &Symbol, kind: HolderKind) -> Result<DataFrame>;
}
