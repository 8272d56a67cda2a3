//! Cache keys and the persisted artifact naming scheme.
//!
//! A [`CacheKey`] is derived from a symbol, a [`DataKind`] and an optional
//! [`SubKind`]. It maps to exactly one artifact name:
//!
//! | kind                        | artifact                              |
//! |-----------------------------|---------------------------------------|
//! | price series                | `<id>.csv`                            |
//! | annual statement sub-kind   | `<id>_<subkind>.csv`                  |
//! | quarterly statement sub-kind| `<id>_quarterly_<subkind>.csv`        |
//! | holder sub-kind             | `<id>_<subkind>.csv`                  |
//! | company info                | `<id>_info.json`                      |
//!
//! The `<id>` part is escaped (`%`, `_`, `/`, `\`) so that the first `_` of a
//! name always separates the identifier from the suffix and no name can point
//! outside the store root.

use std::fmt;

use crate::kind::{DataKind, HolderKind, PeriodType, StatementKind, SubKind};
use crate::types::Symbol;

/// On-disk encoding of a cached artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Delimited text (CSV), used for every tabular record.
    DelimitedText,
    /// Structured text (JSON), used for scalar documents.
    StructuredText,
}

impl Encoding {
    /// File extension for this encoding.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::DelimitedText => "csv",
            Self::StructuredText => "json",
        }
    }
}

/// Key of one persisted cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    symbol: Symbol,
    kind: DataKind,
    sub_kind: Option<SubKind>,
}

impl CacheKey {
    /// Key of a symbol's price series.
    #[must_use]
    pub fn price_series(symbol: &Symbol) -> Self {
        Self {
            symbol: symbol.clone(),
            kind: DataKind::PriceSeries,
            sub_kind: None,
        }
    }

    /// Key of one statement table of an annual or quarterly bundle.
    #[must_use]
    pub fn statement(symbol: &Symbol, period: PeriodType, kind: StatementKind) -> Self {
        let data_kind = match period {
            PeriodType::Annual => DataKind::AnnualStatements,
            PeriodType::Quarterly => DataKind::QuarterlyStatements,
        };
        Self {
            symbol: symbol.clone(),
            kind: data_kind,
            sub_kind: Some(SubKind::Statement(kind)),
        }
    }

    /// Key of one holders/recommendations table.
    #[must_use]
    pub fn holder(symbol: &Symbol, kind: HolderKind) -> Self {
        Self {
            symbol: symbol.clone(),
            kind: DataKind::HoldersAndRecommendations,
            sub_kind: Some(SubKind::Holder(kind)),
        }
    }

    /// Key of a symbol's company info document.
    #[must_use]
    pub fn company_info(symbol: &Symbol) -> Self {
        Self {
            symbol: symbol.clone(),
            kind: DataKind::CompanyInfo,
            sub_kind: None,
        }
    }

    /// The symbol this key belongs to.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The data kind this key belongs to.
    #[must_use]
    pub const fn kind(&self) -> DataKind {
        self.kind
    }

    /// The bundle component, if any.
    #[must_use]
    pub const fn sub_kind(&self) -> Option<SubKind> {
        self.sub_kind
    }

    /// Encoding used for the artifact.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        match self.kind {
            DataKind::CompanyInfo => Encoding::StructuredText,
            _ => Encoding::DelimitedText,
        }
    }

    /// Artifact name without extension.
    #[must_use]
    pub fn stem(&self) -> String {
        let id = escape_identifier(self.symbol.as_str());
        match (self.kind, self.sub_kind) {
            (DataKind::CompanyInfo, _) => format!("{id}_info"),
            (DataKind::QuarterlyStatements, Some(sub)) => format!("{id}_quarterly_{sub}"),
            (_, Some(sub)) => format!("{id}_{sub}"),
            (_, None) => id,
        }
    }

    /// Artifact file name, including the encoding's extension.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem(), self.encoding().extension())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn escape_identifier(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for c in id.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '_' => escaped.push_str("%5F"),
            '/' => escaped.push_str("%2F"),
            '\\' => escaped.push_str("%5C"),
            c => escaped.push(c),
        }
    }
    escaped
}
