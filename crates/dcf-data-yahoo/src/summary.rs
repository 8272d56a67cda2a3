//! quoteSummary API: company info, holders and recommendations.

use dcf_data_core::{DataError, HolderKind, Result, Symbol};
use polars::prelude::*;
use serde_json::{Map, Value};

use crate::response::{Envelope, check_envelope, fmt_string, raw_f64, raw_value};

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Modules merged into the company info document, in merge order.
pub(crate) const INFO_MODULES: &[&str] = &[
    "assetProfile",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "price",
    "quoteType",
];

/// Rows of the major holders breakdown, in table order.
const MAJOR_HOLDER_FIELDS: &[&str] = &[
    "insidersPercentHeld",
    "institutionsPercentHeld",
    "institutionsFloatPercentHeld",
    "institutionsCount",
];

/// Columns of the recommendations table after `period`.
const RECOMMENDATION_FIELDS: &[&str] = &["strongBuy", "buy", "hold", "sell", "strongSell"];

/// quoteSummary module backing a holders table.
pub(crate) const fn holder_module(kind: HolderKind) -> &'static str {
    match kind {
        HolderKind::InstitutionalHolders => "institutionOwnership",
        HolderKind::MajorHolders => "majorHoldersBreakdown",
        HolderKind::Recommendations => "recommendationTrend",
    }
}

/// Build the quoteSummary URL for a set of modules.
pub(crate) fn quote_summary_url(symbol: &Symbol, modules: &[&str]) -> String {
    format!(
        "{}/{}?modules={}",
        QUOTE_SUMMARY_URL,
        symbol.as_str(),
        modules.join(",")
    )
}

/// First quoteSummary result, or `None` for an unknown symbol.
fn first_result(value: &Value) -> Result<Option<&Value>> {
    if check_envelope(value)? == Envelope::NotFound {
        return Ok(None);
    }
    Ok(value
        .get("quoteSummary")
        .and_then(|qs| qs.get("result"))
        .and_then(Value::as_array)
        .and_then(|results| results.first()))
}

/// Flatten the info modules into one key/value document.
///
/// `{raw, fmt}` wrappers are reduced to `raw`, empty values and `maxAge`
/// bookkeeping fields are dropped, later modules override earlier ones.
pub(crate) fn parse_company_info(value: &Value) -> Result<Map<String, Value>> {
    let mut info = Map::new();
    let Some(result) = first_result(value)? else {
        return Ok(info);
    };

    for module in INFO_MODULES {
        let Some(fields) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, field) in fields {
            if key == "maxAge" {
                continue;
            }
            if let Some(field) = raw_value(field) {
                info.insert(key.clone(), field);
            }
        }
    }

    Ok(info)
}

/// Parse one holders/recommendations table.
pub(crate) fn parse_holders(value: &Value, kind: HolderKind) -> Result<DataFrame> {
    let Some(module) = first_result(value)?.and_then(|r| r.get(holder_module(kind))) else {
        return Ok(DataFrame::empty());
    };

    let frame = match kind {
        HolderKind::InstitutionalHolders => institutional_holders(module),
        HolderKind::MajorHolders => major_holders(module),
        HolderKind::Recommendations => recommendations(module),
    };
    frame.map_err(|e| DataError::Parse(e.to_string()))
}

fn institutional_holders(module: &Value) -> PolarsResult<DataFrame> {
    let owners = list(module, "ownershipList");
    if owners.is_empty() {
        return Ok(DataFrame::empty());
    }

    let reported: Vec<Option<String>> = owners
        .iter()
        .map(|o| fmt_string(o.get("reportDate")))
        .collect();
    let holders: Vec<Option<&str>> = owners
        .iter()
        .map(|o| o.get("organization").and_then(Value::as_str))
        .collect();
    let pct_held: Vec<Option<f64>> = owners.iter().map(|o| raw_f64(o.get("pctHeld"))).collect();
    let shares: Vec<Option<i64>> = owners
        .iter()
        .map(|o| raw_f64(o.get("position")).map(|v| v as i64))
        .collect();
    let value: Vec<Option<i64>> = owners
        .iter()
        .map(|o| raw_f64(o.get("value")).map(|v| v as i64))
        .collect();
    let pct_change: Vec<Option<f64>> = owners
        .iter()
        .map(|o| raw_f64(o.get("pctChange")))
        .collect();

    DataFrame::new(vec![
        Column::new("Date Reported".into(), reported),
        Column::new("Holder".into(), holders),
        Column::new("pctHeld".into(), pct_held),
        Column::new("Shares".into(), shares),
        Column::new("Value".into(), value),
        Column::new("pctChange".into(), pct_change),
    ])
}

fn major_holders(module: &Value) -> PolarsResult<DataFrame> {
    let rows: Vec<(&str, f64)> = MAJOR_HOLDER_FIELDS
        .iter()
        .filter_map(|field| raw_f64(module.get(*field)).map(|v| (*field, v)))
        .collect();
    if rows.is_empty() {
        return Ok(DataFrame::empty());
    }

    DataFrame::new(vec![
        Column::new(
            "Breakdown".into(),
            rows.iter().map(|(field, _)| *field).collect::<Vec<_>>(),
        ),
        Column::new(
            "Value".into(),
            rows.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
        ),
    ])
}

fn recommendations(module: &Value) -> PolarsResult<DataFrame> {
    let trend = list(module, "trend");
    if trend.is_empty() {
        return Ok(DataFrame::empty());
    }

    let mut columns = Vec::with_capacity(RECOMMENDATION_FIELDS.len() + 1);
    columns.push(Column::new(
        "period".into(),
        trend
            .iter()
            .map(|t| t.get("period").and_then(Value::as_str))
            .collect::<Vec<_>>(),
    ));
    for field in RECOMMENDATION_FIELDS {
        columns.push(Column::new(
            (*field).into(),
            trend
                .iter()
                .map(|t| raw_f64(t.get(*field)).map(|v| v as i64))
                .collect::<Vec<_>>(),
        ));
    }
    DataFrame::new(columns)
}

fn list<'a>(module: &'a Value, field: &str) -> &'a [Value] {
    module
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(result: Value) -> Value {
        json!({"quoteSummary": {"result": [result], "error": null}})
    }

    #[test]
    fn test_quote_summary_url() {
        let url = quote_summary_url(&Symbol::new("ACME"), INFO_MODULES);
        assert!(url.ends_with(
            "/ACME?modules=assetProfile,summaryDetail,defaultKeyStatistics,financialData,price,quoteType"
        ));
    }

    #[test]
    fn test_parse_company_info_flattens_modules() {
        let response = summary(json!({
            "assetProfile": {"sector": "Industrials", "fullTimeEmployees": 1200, "maxAge": 86400},
            "summaryDetail": {"beta": {"raw": 1.2, "fmt": "1.20"}, "dividendYield": {}, "maxAge": 1},
            "defaultKeyStatistics": {"sharesOutstanding": {"raw": 1000000, "fmt": "1M", "longFmt": "1,000,000"}},
            "price": {"marketCap": {"raw": 5.0e9, "fmt": "5B"}, "currency": "USD"}
        }));

        let info = parse_company_info(&response).unwrap();
        assert_eq!(info.get("sector"), Some(&json!("Industrials")));
        assert_eq!(info.get("beta"), Some(&json!(1.2)));
        assert_eq!(info.get("sharesOutstanding"), Some(&json!(1000000)));
        assert_eq!(info.get("marketCap").and_then(Value::as_f64), Some(5.0e9));
        assert!(!info.contains_key("dividendYield"));
        assert!(!info.contains_key("maxAge"));
    }

    #[test]
    fn test_unknown_symbol_info_is_empty() {
        let response = json!({"quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found for ticker symbol: ZZZZ"}}});
        assert!(parse_company_info(&response).unwrap().is_empty());
        assert_eq!(
            parse_holders(&response, HolderKind::MajorHolders).unwrap().height(),
            0
        );
    }

    #[test]
    fn test_parse_institutional_holders() {
        let response = summary(json!({
            "institutionOwnership": {
                "maxAge": 1,
                "ownershipList": [
                    {
                        "reportDate": {"raw": 1688083200, "fmt": "2023-06-30"},
                        "organization": "Vanguard Group Inc",
                        "pctHeld": {"raw": 0.0834, "fmt": "8.34%"},
                        "position": {"raw": 1303688506, "fmt": "1.3B"},
                        "value": {"raw": 252876459508_i64, "fmt": "252.88B"},
                        "pctChange": {"raw": 0.0112, "fmt": "1.12%"}
                    },
                    {
                        "reportDate": {"raw": 1688083200, "fmt": "2023-06-30"},
                        "organization": "Blackrock Inc.",
                        "pctHeld": {"raw": 0.0655, "fmt": "6.55%"},
                        "position": {"raw": 1023807218, "fmt": "1.02B"},
                        "value": {"raw": 198587881525_i64, "fmt": "198.59B"}
                    }
                ]
            }
        }));

        let df = parse_holders(&response, HolderKind::InstitutionalHolders).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            df.column("Holder").unwrap().str().unwrap().get(1),
            Some("Blackrock Inc.")
        );
        assert_eq!(
            df.column("Date Reported").unwrap().str().unwrap().get(0),
            Some("2023-06-30")
        );
        assert_eq!(
            df.column("Shares").unwrap().i64().unwrap().get(0),
            Some(1_303_688_506)
        );
        assert_eq!(df.column("pctChange").unwrap().f64().unwrap().get(1), None);
    }

    #[test]
    fn test_parse_major_holders() {
        let response = summary(json!({
            "majorHoldersBreakdown": {
                "maxAge": 1,
                "insidersPercentHeld": {"raw": 0.0007, "fmt": "0.07%"},
                "institutionsPercentHeld": {"raw": 0.6105, "fmt": "61.05%"},
                "institutionsCount": {"raw": 6000, "fmt": "6k"}
            }
        }));

        let df = parse_holders(&response, HolderKind::MajorHolders).unwrap();
        let breakdown: Vec<Option<&str>> =
            df.column("Breakdown").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(
            breakdown,
            [
                Some("insidersPercentHeld"),
                Some("institutionsPercentHeld"),
                Some("institutionsCount")
            ]
        );
        assert_eq!(df.column("Value").unwrap().f64().unwrap().get(2), Some(6000.0));
    }

    #[test]
    fn test_parse_recommendations() {
        let response = summary(json!({
            "recommendationTrend": {
                "trend": [
                    {"period": "0m", "strongBuy": 11, "buy": 21, "hold": 6, "sell": 0, "strongSell": 0},
                    {"period": "-1m", "strongBuy": 10, "buy": 24, "hold": 7, "sell": 1, "strongSell": 0}
                ],
                "maxAge": 86400
            }
        }));

        let df = parse_holders(&response, HolderKind::Recommendations).unwrap();
        let names: Vec<&str> = df
            .get_column_names()
            .into_iter()
            .map(PlSmallStr::as_str)
            .collect();
        assert_eq!(names, ["period", "strongBuy", "buy", "hold", "sell", "strongSell"]);
        assert_eq!(df.column("buy").unwrap().i64().unwrap().get(1), Some(24));
    }

    #[test]
    fn test_missing_module_is_empty() {
        let response = summary(json!({"recommendationTrend": {"trend": [], "maxAge": 1}}));
        assert_eq!(
            parse_holders(&response, HolderKind::Recommendations)
                .unwrap()
                .height(),
            0
        );
        assert_eq!(
            parse_holders(&response, HolderKind::InstitutionalHolders)
                .unwrap()
                .height(),
            0
        );
    }
}
