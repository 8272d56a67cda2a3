//! Data kind and sub-kind definitions.
//!
//! A [`DataKind`] names one of the five record categories served by the cache.
//! Bundle kinds (statements, holders) are made of independent [`SubKind`]s,
//! each of which is cached and resolved on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Period type for fundamental financial data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}

impl PeriodType {
    /// Returns the lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three financial statements making up a statement bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Income statement (`income_stmt`).
    #[serde(rename = "income_stmt")]
    IncomeStatement,
    /// Balance sheet (`balance_sheet`).
    #[serde(rename = "balance_sheet")]
    BalanceSheet,
    /// Cash-flow statement (`cashflow`).
    #[serde(rename = "cashflow")]
    CashFlow,
}

impl StatementKind {
    /// All statement kinds, in bundle order.
    pub const ALL: [Self; 3] = [Self::IncomeStatement, Self::BalanceSheet, Self::CashFlow];

    /// Returns the sub-kind name used in cache file names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "income_stmt",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlow => "cashflow",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the holder/recommendation tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderKind {
    /// Institutional holders (`institutional_holders`).
    InstitutionalHolders,
    /// Major holders breakdown (`major_holders`).
    MajorHolders,
    /// Analyst recommendations (`recommendations`).
    Recommendations,
}

impl HolderKind {
    /// All holder kinds, in bundle order.
    pub const ALL: [Self; 3] = [
        Self::InstitutionalHolders,
        Self::MajorHolders,
        Self::Recommendations,
    ];

    /// Returns the sub-kind name used in cache file names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InstitutionalHolders => "institutional_holders",
            Self::MajorHolders => "major_holders",
            Self::Recommendations => "recommendations",
        }
    }
}

impl fmt::Display for HolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named component within a multi-table bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubKind {
    /// A statement table of a statement bundle.
    Statement(StatementKind),
    /// A table of the holders/recommendations bundle.
    Holder(HolderKind),
}

impl SubKind {
    /// Returns the sub-kind name used in cache file names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Statement(kind) => kind.as_str(),
            Self::Holder(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for SubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StatementKind> for SubKind {
    fn from(kind: StatementKind) -> Self {
        Self::Statement(kind)
    }
}

impl From<HolderKind> for SubKind {
    fn from(kind: HolderKind) -> Self {
        Self::Holder(kind)
    }
}

const STATEMENT_SUB_KINDS: [SubKind; 3] = [
    SubKind::Statement(StatementKind::IncomeStatement),
    SubKind::Statement(StatementKind::BalanceSheet),
    SubKind::Statement(StatementKind::CashFlow),
];

const HOLDER_SUB_KINDS: [SubKind; 3] = [
    SubKind::Holder(HolderKind::InstitutionalHolders),
    SubKind::Holder(HolderKind::MajorHolders),
    SubKind::Holder(HolderKind::Recommendations),
];

/// The record categories served by the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Daily OHLCV price history.
    PriceSeries,
    /// Annual income statement, balance sheet and cash flow.
    AnnualStatements,
    /// Quarterly income statement, balance sheet and cash flow.
    QuarterlyStatements,
    /// Flat company metadata mapping.
    CompanyInfo,
    /// Institutional/major holders and analyst recommendations.
    HoldersAndRecommendations,
}

impl DataKind {
    /// All data kinds.
    pub const ALL: [Self; 5] = [
        Self::PriceSeries,
        Self::AnnualStatements,
        Self::QuarterlyStatements,
        Self::CompanyInfo,
        Self::HoldersAndRecommendations,
    ];

    /// Returns the snake_case name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PriceSeries => "price_series",
            Self::AnnualStatements => "annual_statements",
            Self::QuarterlyStatements => "quarterly_statements",
            Self::CompanyInfo => "company_info",
            Self::HoldersAndRecommendations => "holders_and_recommendations",
        }
    }

    /// Returns the fixed sub-kind set of a bundle kind.
    ///
    /// Single-record kinds (`PriceSeries`, `CompanyInfo`) return an empty slice.
    #[must_use]
    pub const fn sub_kinds(&self) -> &'static [SubKind] {
        match self {
            Self::AnnualStatements | Self::QuarterlyStatements => &STATEMENT_SUB_KINDS,
            Self::HoldersAndRecommendations => &HOLDER_SUB_KINDS,
            Self::PriceSeries | Self::CompanyInfo => &[],
        }
    }

    /// Returns the reporting period of a statement kind.
    #[must_use]
    pub const fn period(&self) -> Option<PeriodType> {
        match self {
            Self::AnnualStatements => Some(PeriodType::Annual),
            Self::QuarterlyStatements => Some(PeriodType::Quarterly),
            _ => None,
        }
    }

    /// Returns true if this kind is made of independently cached sub-kinds.
    #[must_use]
    pub const fn is_bundle(&self) -> bool {
        !self.sub_kinds().is_empty()
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
