//! Record types returned by the cache.
//!
//! - [`PriceSeries`] - Date-indexed OHLCV table
//! - [`StatementTable`] / [`StatementBundle`] - Line items by report date
//! - [`RelationalTable`] / [`HolderBundle`] - Small tables without an index
//! - [`CompanyInfo`] - Flat key/value metadata document
//! - [`Record`] - Union of the above, returned by the generic fetch

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{Column, DataFrame, DataType, PlSmallStr};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{DataError, Result};
use crate::kind::{DataKind, HolderKind, PeriodType, StatementKind};
use crate::types::date_values;

/// Name of the leading date column of a price series.
pub const DATE_COLUMN: &str = "Date";

/// Name of the closing price column of a price series.
pub const CLOSE_COLUMN: &str = "Close";

/// Name of the leading label column of a statement table.
pub const LINE_ITEM_COLUMN: &str = "line_item";

/// Separator between header levels in a two-level column name (`Close|AAPL`).
pub const LEVEL_SEPARATOR: char = '|';

/// Implemented by every record shape the router persists.
pub trait CacheableRecord {
    /// Returns true if the record carries data worth persisting.
    fn has_content(&self) -> bool;
}

// ============================================================================
// Price series
// ============================================================================

/// Daily OHLCV price history.
///
/// The frame's leading column is [`DATE_COLUMN`] (polars `Date` type), followed
/// by at least `Open`, `High`, `Low`, `Close` and `Volume`, in chronological
/// order.
#[derive(Clone, Debug, Default)]
pub struct PriceSeries(DataFrame);

impl PriceSeries {
    /// Wraps an already normalized frame.
    #[must_use]
    pub const fn new(frame: DataFrame) -> Self {
        Self(frame)
    }

    /// Normalizes a provider or decoded frame into a price series.
    ///
    /// Two-level headers (`Field|Ticker`) are flattened to their first level,
    /// the date column is moved to the front and narrowed to a `Date` type.
    /// When flattening produces a duplicate field name, the first column wins.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if a non-empty frame has no date column.
    pub fn normalize(frame: DataFrame) -> Result<Self> {
        let mut columns: Vec<Column> = Vec::with_capacity(frame.width());

        for column in frame.get_columns() {
            let name = column.name().as_str();
            let field = name.split(LEVEL_SEPARATOR).next().unwrap_or(name);
            if columns.iter().any(|c| c.name().as_str() == field) {
                continue;
            }
            columns.push(column.clone().with_name(PlSmallStr::from(field)));
        }

        match columns.iter().position(|c| c.name().as_str() == DATE_COLUMN) {
            Some(position) => {
                let date = narrow_to_date(columns.remove(position))?;
                columns.insert(0, date);
            }
            None if frame.height() > 0 => {
                return Err(DataError::Parse(format!(
                    "price history has no {DATE_COLUMN} column"
                )));
            }
            None => {}
        }

        DataFrame::new(columns)
            .map(Self)
            .map_err(|e| DataError::Parse(e.to_string()))
    }

    /// Returns the underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.0
    }

    /// Consumes the series and returns the underlying frame.
    #[must_use]
    pub fn into_frame(self) -> DataFrame {
        self.0
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.height()
    }

    /// Returns true if the series has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }

    /// Returns the row dates.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if the date column is missing or untyped.
    pub fn dates(&self) -> Result<Vec<Option<NaiveDate>>> {
        let column = self
            .0
            .column(DATE_COLUMN)
            .map_err(|e| DataError::Parse(e.to_string()))?;
        date_values(column)
    }

    /// Returns the `Date`/`Close` slice of the series.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if either column is missing.
    pub fn close(&self) -> Result<DataFrame> {
        self.0
            .select([DATE_COLUMN, CLOSE_COLUMN])
            .map_err(|e| DataError::Parse(e.to_string()))
    }
}

impl PartialEq for PriceSeries {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals_missing(&other.0)
    }
}

impl CacheableRecord for PriceSeries {
    fn has_content(&self) -> bool {
        !self.is_empty()
    }
}

/// Narrows a datetime or string date column to a polars `Date` column.
///
/// # Errors
/// Returns [`DataError::Parse`] if the column cannot be cast.
pub fn narrow_to_date(column: Column) -> Result<Column> {
    match column.dtype() {
        DataType::Date => Ok(column),
        _ => column
            .cast(&DataType::Date)
            .map_err(|e| DataError::Parse(format!("{DATE_COLUMN} column: {e}"))),
    }
}

// ============================================================================
// Statement tables
// ============================================================================

/// Period headers of a statement table.
///
/// Headers are reinterpreted as dates only when every one of them parses;
/// otherwise the original labels are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnHeaders {
    /// Every header parsed as a report date.
    Dates(Vec<NaiveDate>),
    /// At least one header is not a date; the original labels.
    Labels(Vec<String>),
}

impl ColumnHeaders {
    /// Parses period labels into dates, falling back to the labels themselves.
    pub fn parse<S: AsRef<str>>(labels: &[S]) -> Self {
        let parsed: Option<Vec<NaiveDate>> =
            labels.iter().map(|label| parse_report_date(label.as_ref())).collect();
        match parsed {
            Some(dates) => Self::Dates(dates),
            None => Self::Labels(labels.iter().map(|l| l.as_ref().to_string()).collect()),
        }
    }

    /// Returns true if the headers were parsed as dates.
    #[must_use]
    pub const fn is_dates(&self) -> bool {
        matches!(self, Self::Dates(_))
    }

    /// Returns the parsed dates, if parsing succeeded.
    #[must_use]
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        match self {
            Self::Dates(dates) => Some(dates),
            Self::Labels(_) => None,
        }
    }

    /// Number of period columns.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Dates(dates) => dates.len(),
            Self::Labels(labels) => labels.len(),
        }
    }

    /// Returns true if there are no period columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ColumnHeaders {
    fn default() -> Self {
        Self::Labels(Vec::new())
    }
}

fn parse_report_date(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    NaiveDate::parse_from_str(label, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(label, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(label, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// One financial statement: line items (rows) by report date (columns).
///
/// The leading column holds the line-item labels ([`LINE_ITEM_COLUMN`]); every
/// other column is one reporting period.
#[derive(Clone, Debug, Default)]
pub struct StatementTable {
    frame: DataFrame,
    periods: ColumnHeaders,
}

impl StatementTable {
    /// Wraps a frame, reinterpreting its period headers.
    #[must_use]
    pub fn from_frame(frame: DataFrame) -> Self {
        let labels: Vec<&str> = frame
            .get_column_names()
            .into_iter()
            .skip(1)
            .map(PlSmallStr::as_str)
            .collect();
        let periods = ColumnHeaders::parse(&labels);
        Self { frame, periods }
    }

    /// An empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Consumes the table and returns the underlying frame.
    #[must_use]
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Returns the period headers.
    #[must_use]
    pub const fn periods(&self) -> &ColumnHeaders {
        &self.periods
    }

    /// Number of line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    /// Returns true if there are no line items or no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0 || self.frame.width() <= 1
    }

    /// Returns the line-item labels, in row order.
    #[must_use]
    pub fn line_items(&self) -> Vec<String> {
        let Some(labels) = self.frame.get_columns().first() else {
            return Vec::new();
        };
        match labels.str() {
            Ok(labels) => labels
                .into_iter()
                .map(|label| label.unwrap_or_default().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Returns the value of a line item in the given period column.
    #[must_use]
    pub fn value(&self, line_item: &str, period: usize) -> Option<f64> {
        let row = self.line_items().iter().position(|l| l == line_item)?;
        let column = self.frame.get_columns().get(period + 1)?;
        let values = column.cast(&DataType::Float64).ok()?;
        values.f64().ok()?.get(row)
    }
}

impl PartialEq for StatementTable {
    fn eq(&self, other: &Self) -> bool {
        self.periods == other.periods && self.frame.equals_missing(&other.frame)
    }
}

impl CacheableRecord for StatementTable {
    fn has_content(&self) -> bool {
        !self.is_empty()
    }
}

/// Income statement, balance sheet and cash flow for one period type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatementBundle {
    period: PeriodType,
    tables: BTreeMap<StatementKind, StatementTable>,
}

impl StatementBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub const fn new(period: PeriodType) -> Self {
        Self {
            period,
            tables: BTreeMap::new(),
        }
    }

    /// Reporting period of the bundle.
    #[must_use]
    pub const fn period(&self) -> PeriodType {
        self.period
    }

    /// Adds or replaces one statement.
    pub fn insert(&mut self, kind: StatementKind, table: StatementTable) {
        self.tables.insert(kind, table);
    }

    /// Returns one statement, if it was requested.
    #[must_use]
    pub fn get(&self, kind: StatementKind) -> Option<&StatementTable> {
        self.tables.get(&kind)
    }

    /// The income statement.
    #[must_use]
    pub fn income_statement(&self) -> Option<&StatementTable> {
        self.get(StatementKind::IncomeStatement)
    }

    /// The balance sheet.
    #[must_use]
    pub fn balance_sheet(&self) -> Option<&StatementTable> {
        self.get(StatementKind::BalanceSheet)
    }

    /// The cash-flow statement.
    #[must_use]
    pub fn cash_flow(&self) -> Option<&StatementTable> {
        self.get(StatementKind::CashFlow)
    }

    /// Iterates over the statements in bundle order.
    pub fn iter(&self) -> impl Iterator<Item = (StatementKind, &StatementTable)> {
        self.tables.iter().map(|(kind, table)| (*kind, table))
    }

    /// Number of statements in the bundle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the bundle holds no statement with data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(StatementTable::is_empty)
    }
}

// ============================================================================
// Relational tables
// ============================================================================

/// A small table without an index column; row order is significant.
#[derive(Clone, Debug, Default)]
pub struct RelationalTable(DataFrame);

impl RelationalTable {
    /// Wraps a frame.
    #[must_use]
    pub const fn new(frame: DataFrame) -> Self {
        Self(frame)
    }

    /// An empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.0
    }

    /// Consumes the table and returns the underlying frame.
    #[must_use]
    pub fn into_frame(self) -> DataFrame {
        self.0
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.height()
    }

    /// Returns true if the table has no rows or no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.height() == 0 || self.0.width() == 0
    }
}

impl PartialEq for RelationalTable {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals_missing(&other.0)
    }
}

impl CacheableRecord for RelationalTable {
    fn has_content(&self) -> bool {
        !self.is_empty()
    }
}

/// Institutional holders, major holders and recommendations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HolderBundle {
    tables: BTreeMap<HolderKind, RelationalTable>,
}

impl HolderBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Adds or replaces one table.
    pub fn insert(&mut self, kind: HolderKind, table: RelationalTable) {
        self.tables.insert(kind, table);
    }

    /// Returns one table, if it was requested.
    #[must_use]
    pub fn get(&self, kind: HolderKind) -> Option<&RelationalTable> {
        self.tables.get(&kind)
    }

    /// Iterates over the tables in bundle order.
    pub fn iter(&self) -> impl Iterator<Item = (HolderKind, &RelationalTable)> {
        self.tables.iter().map(|(kind, table)| (*kind, table))
    }

    /// Number of tables in the bundle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the bundle holds no table with data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(RelationalTable::is_empty)
    }
}

// ============================================================================
// Company info
// ============================================================================

/// Company metadata as a flat key/value mapping (beta, market cap, ...).
///
/// Values are expected to be scalars; nested values supplied by a provider
/// are kept as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyInfo(Map<String, Value>);

impl CompanyInfo {
    /// Wraps a key/value mapping.
    #[must_use]
    pub const fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the raw value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a numeric value.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Returns a string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the underlying mapping.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the document and returns the underlying mapping.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for CompanyInfo {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl CacheableRecord for CompanyInfo {
    fn has_content(&self) -> bool {
        !self.is_empty()
    }
}

// ============================================================================
// Record
// ============================================================================

/// The payload for one symbol and data kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// A price series.
    PriceSeries(PriceSeries),
    /// An annual or quarterly statement bundle.
    Statements(StatementBundle),
    /// A company info document.
    CompanyInfo(CompanyInfo),
    /// A holders/recommendations bundle.
    Holders(HolderBundle),
}

impl Record {
    /// The data kind of this record.
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        match self {
            Self::PriceSeries(_) => DataKind::PriceSeries,
            Self::Statements(bundle) => match bundle.period() {
                PeriodType::Annual => DataKind::AnnualStatements,
                PeriodType::Quarterly => DataKind::QuarterlyStatements,
            },
            Self::CompanyInfo(_) => DataKind::CompanyInfo,
            Self::Holders(_) => DataKind::HoldersAndRecommendations,
        }
    }

    /// Returns true if the record (or every table of a bundle) is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::PriceSeries(series) => series.is_empty(),
            Self::Statements(bundle) => bundle.is_empty(),
            Self::CompanyInfo(info) => info.is_empty(),
            Self::Holders(bundle) => bundle.is_empty(),
        }
    }

    /// Returns the price series, if this is one.
    #[must_use]
    pub fn into_price_series(self) -> Option<PriceSeries> {
        match self {
            Self::PriceSeries(series) => Some(series),
            _ => None,
        }
    }

    /// Returns the statement bundle, if this is one.
    #[must_use]
    pub fn into_statements(self) -> Option<StatementBundle> {
        match self {
            Self::Statements(bundle) => Some(bundle),
            _ => None,
        }
    }

    /// Returns the company info, if this is one.
    #[must_use]
    pub fn into_company_info(self) -> Option<CompanyInfo> {
        match self {
            Self::CompanyInfo(info) => Some(info),
            _ => None,
        }
    }

    /// Returns the holders bundle, if this is one.
    #[must_use]
    pub fn into_holders(self) -> Option<HolderBundle> {
        match self {
            Self::Holders(bundle) => Some(bundle),
            _ => None,
        }
    }
}
