//! Core value types.
//!
//! - [`Symbol`] - Opaque market identifier
//! - [`date_column`] / [`date_values`] - Conversions between chrono dates and polars `Date` columns

use chrono::{Datelike, NaiveDate};
use polars::prelude::{Column, DataType, PlSmallStr};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DataError, Result};

/// Days between 0001-01-01 (chrono's CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A market identifier (ticker).
///
/// The identifier is opaque: case and format are passed through untouched,
/// so `"^TNX"`, `"brk-b"` and `"7203.T"` reach the provider exactly as given.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds a polars `Date` column from chrono dates.
///
/// # Errors
/// Returns [`DataError::Other`] if the cast to `Date` fails.
pub fn date_column(name: &str, dates: &[NaiveDate]) -> Result<Column> {
    let days: Vec<i32> = dates.iter().copied().map(days_since_epoch).collect();
    Column::new(PlSmallStr::from(name), days)
        .cast(&DataType::Date)
        .map_err(|e| DataError::Other(e.to_string()))
}

/// Reads a polars `Date` column back into chrono dates.
///
/// # Errors
/// Returns [`DataError::Parse`] if the column is not of `Date` type.
pub fn date_values(column: &Column) -> Result<Vec<Option<NaiveDate>>> {
    let dates = column.date().map_err(|e| DataError::Parse(e.to_string()))?;
    Ok((&dates.0)
        .into_iter()
        .map(|days| days.and_then(date_from_epoch_days))
        .collect())
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}
