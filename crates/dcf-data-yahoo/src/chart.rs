//! v8 chart API: daily price history.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dcf_data_core::{DataError, Result, Symbol, types::date_column};
use polars::prelude::*;
use serde::Deserialize;

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Build the chart API URL for a symbol and date range.
///
/// `end` is inclusive; `None` asks for everything up to `now`.
pub(crate) fn chart_url(
    symbol: &Symbol,
    start: NaiveDate,
    end: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> String {
    let start_ts = start
        .and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
        .unwrap_or(0);

    let end_ts = end
        .and_then(|end| end.and_hms_opt(23, 59, 59))
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
        .unwrap_or_else(|| now.timestamp());

    format!(
        "{}/{}?period1={}&period2={}&interval=1d&events=div%2Csplits&includeAdjustedClose=true",
        CHART_API_URL,
        symbol.as_str(),
        start_ts,
        end_ts
    )
}

/// Parse a chart response into a `Date`/OHLCV frame.
///
/// A "Not Found" error or a result without bars yields an empty frame.
pub(crate) fn parse_chart(response: ChartResponse) -> Result<DataFrame> {
    if let Some(error) = response.chart.error {
        if error.code == "Not Found" {
            return Ok(DataFrame::empty());
        }
        return Err(DataError::Other(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    let Some(result) = response.chart.result.into_iter().flatten().next() else {
        return Ok(DataFrame::empty());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Ok(DataFrame::empty());
    }

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::Parse("Missing quote data".to_string()))?;

    // Bars are stamped at the exchange open; shift to exchange time before
    // taking the calendar date.
    let offset = result.meta.and_then(|meta| meta.gmtoffset).unwrap_or(0);
    let dates: Vec<NaiveDate> = timestamps
        .iter()
        .map(|&ts| {
            Utc.timestamp_opt(ts + offset, 0)
                .single()
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::Parse(format!("Invalid bar timestamp {ts}")))
        })
        .collect::<Result<_>>()?;

    let closes = quote.close;
    let adj_closes: Vec<Option<f64>> = result
        .indicators
        .adjclose
        .and_then(|ac| ac.into_iter().next())
        .map(|ac| ac.adjclose)
        .filter(|ac| ac.len() == dates.len())
        .unwrap_or_else(|| closes.clone());
    let volumes: Vec<Option<i64>> = quote
        .volume
        .into_iter()
        .map(|v| v.and_then(|v| i64::try_from(v).ok()))
        .collect();

    DataFrame::new(vec![
        date_column("Date", &dates)?,
        Column::new("Open".into(), quote.open),
        Column::new("High".into(), quote.high),
        Column::new("Low".into(), quote.low),
        Column::new("Close".into(), closes),
        Column::new("Adj Close".into(), adj_closes),
        Column::new("Volume".into(), volumes),
    ])
    .map_err(|e| DataError::Parse(e.to_string()))
}

// ============================================================================
// Chart API response types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}
