//! Fundamentals-timeseries API: annual and quarterly financial statements.
//!
//! The endpoint returns one series per requested line item (`annualTotalRevenue`,
//! `quarterlyFreeCashFlow`, ...). Series are pivoted into a statement table:
//! one row per line item, one column per report date, most recent first.

use chrono::{DateTime, NaiveDate, Utc};
use dcf_data_core::record::LINE_ITEM_COLUMN;
use dcf_data_core::{DataError, PeriodType, Result, StatementKind, Symbol};
use polars::prelude::*;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use crate::response::{Envelope, check_envelope, raw_f64};

/// Yahoo Finance fundamentals-timeseries base URL.
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

/// Earliest timestamp requested (1985-08-23); Yahoo holds at most a few years.
const TIMESERIES_START_TS: i64 = 493_590_046;

const INCOME_STATEMENT_ITEMS: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "ResearchAndDevelopment",
    "SellingGeneralAndAdministration",
    "OperatingExpense",
    "OperatingIncome",
    "EBIT",
    "EBITDA",
    "InterestExpense",
    "PretaxIncome",
    "TaxProvision",
    "TaxRateForCalcs",
    "NetIncome",
    "ReconciledDepreciation",
    "BasicEPS",
    "DilutedEPS",
    "BasicAverageShares",
    "DilutedAverageShares",
];

const BALANCE_SHEET_ITEMS: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "CashCashEquivalentsAndShortTermInvestments",
    "AccountsReceivable",
    "Inventory",
    "NetPPE",
    "Goodwill",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "AccountsPayable",
    "CurrentDebt",
    "LongTermDebt",
    "TotalDebt",
    "NetDebt",
    "StockholdersEquity",
    "TotalEquityGrossMinorityInterest",
    "WorkingCapital",
    "InvestedCapital",
    "ShareIssued",
    "OrdinarySharesNumber",
];

const CASH_FLOW_ITEMS: &[&str] = &[
    "OperatingCashFlow",
    "DepreciationAndAmortization",
    "StockBasedCompensation",
    "ChangeInWorkingCapital",
    "CapitalExpenditure",
    "InvestingCashFlow",
    "IssuanceOfDebt",
    "RepaymentOfDebt",
    "RepurchaseOfCapitalStock",
    "CashDividendsPaid",
    "FinancingCashFlow",
    "EndCashPosition",
    "FreeCashFlow",
];

/// Line items requested for a statement, in row order.
pub(crate) const fn line_items(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::IncomeStatement => INCOME_STATEMENT_ITEMS,
        StatementKind::BalanceSheet => BALANCE_SHEET_ITEMS,
        StatementKind::CashFlow => CASH_FLOW_ITEMS,
    }
}

const fn type_prefix(period: PeriodType) -> &'static str {
    match period {
        PeriodType::Annual => "annual",
        PeriodType::Quarterly => "quarterly",
    }
}

/// Build the timeseries URL for one statement.
pub(crate) fn timeseries_url(
    symbol: &Symbol,
    period: PeriodType,
    kind: StatementKind,
    now: DateTime<Utc>,
) -> String {
    let prefix = type_prefix(period);
    let types: Vec<String> = line_items(kind)
        .iter()
        .map(|item| format!("{prefix}{item}"))
        .collect();

    format!(
        "{}/{}?symbol={}&type={}&period1={}&period2={}",
        TIMESERIES_URL,
        symbol.as_str(),
        symbol.as_str(),
        types.join(","),
        TIMESERIES_START_TS,
        now.timestamp()
    )
}

/// Pivot a timeseries response into a statement frame.
///
/// Line items without any reported value are dropped. An unknown symbol or a
/// response without values yields an empty frame.
pub(crate) fn parse_timeseries(
    value: &Value,
    period: PeriodType,
    kind: StatementKind,
) -> Result<DataFrame> {
    if check_envelope(value)? == Envelope::NotFound {
        return Ok(DataFrame::empty());
    }

    let prefix = type_prefix(period);
    let results = value
        .get("timeseries")
        .and_then(|ts| ts.get("result"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut series: HashMap<&str, HashMap<NaiveDate, Option<f64>>> = HashMap::new();
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();

    for result in results {
        let Some(type_name) = result
            .get("meta")
            .and_then(|meta| meta.get("type"))
            .and_then(Value::as_array)
            .and_then(|types| types.first())
            .and_then(Value::as_str)
        else {
            continue;
        };
        let Some(item) = type_name.strip_prefix(prefix) else {
            continue;
        };
        let Some(entries) = result.get(type_name).and_then(Value::as_array) else {
            continue;
        };

        let values = series.entry(item).or_default();
        for entry in entries.iter().filter(|e| !e.is_null()) {
            let Some(as_of) = entry.get("asOfDate").and_then(Value::as_str) else {
                continue;
            };
            let date = NaiveDate::parse_from_str(as_of, "%Y-%m-%d")
                .map_err(|e| DataError::Parse(format!("asOfDate {as_of}: {e}")))?;
            dates.insert(date);
            values.insert(date, raw_f64(entry.get("reportedValue")));
        }
    }

    let rows: Vec<(&str, &HashMap<NaiveDate, Option<f64>>)> = line_items(kind)
        .iter()
        .filter_map(|item| series.get(item).map(|values| (*item, values)))
        .filter(|(_, values)| values.values().any(Option::is_some))
        .collect();

    if rows.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut columns = Vec::with_capacity(dates.len() + 1);
    columns.push(Column::new(
        LINE_ITEM_COLUMN.into(),
        rows.iter().map(|(item, _)| *item).collect::<Vec<_>>(),
    ));
    for date in dates.iter().rev() {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|(_, values)| values.get(date).copied().flatten())
            .collect();
        columns.push(Column::new(
            date.format("%Y-%m-%d").to_string().into(),
            values,
        ));
    }

    DataFrame::new(columns).map_err(|e| DataError::Parse(e.to_string()))
}
