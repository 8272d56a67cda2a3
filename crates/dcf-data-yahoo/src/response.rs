//! Helpers shared by the JSON endpoint parsers.

use dcf_data_core::{DataError, Result};
use serde_json::Value;

/// Outcome of inspecting the `error` member of a Yahoo response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Envelope {
    /// No error; the result can be parsed.
    Ok,
    /// The symbol is unknown to Yahoo; treat as "no data".
    NotFound,
}

/// Inspects the envelope of a response (`{"quoteSummary": {"result", "error"}}`
/// and friends).
///
/// # Errors
/// Returns [`DataError::Other`] for any API error other than "Not Found".
pub(crate) fn check_envelope(value: &Value) -> Result<Envelope> {
    let Some(envelope) = value.as_object() else {
        return Err(DataError::Parse("expected a JSON object".to_string()));
    };

    for body in envelope.values() {
        let Some(error) = body.get("error").filter(|e| !e.is_null()) else {
            continue;
        };
        let code = error.get("code").and_then(Value::as_str).unwrap_or("Unknown");
        if code == "Not Found" {
            return Ok(Envelope::NotFound);
        }
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(DataError::Other(format!("{code}: {description}")));
    }

    Ok(Envelope::Ok)
}

/// Reduces a `{"raw": .., "fmt": ..}` wrapper to its raw value.
///
/// Wrappers carrying only `fmt` reduce to the formatted string; empty objects
/// reduce to `None`. Any other value is returned unchanged.
pub(crate) fn raw_value(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => match (map.get("raw"), map.get("fmt")) {
            (Some(raw), _) => Some(raw.clone()),
            (None, Some(fmt)) => Some(fmt.clone()),
            (None, None) => Some(value.clone()),
        },
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// Raw numeric value of a scalar or `{raw, fmt}` wrapper.
pub(crate) fn raw_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(raw_value).and_then(|v| v.as_f64())
}

/// Formatted value of a `{raw, fmt}` wrapper, falling back to a plain string.
pub(crate) fn fmt_string(value: Option<&Value>) -> Option<String> {
    let value = value?;
    value
        .get("fmt")
        .and_then(Value::as_str)
        .or_else(|| value.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_envelope() {
        let ok = json!({"quoteSummary": {"result": [], "error": null}});
        assert_eq!(check_envelope(&ok).unwrap(), Envelope::Ok);

        let not_found = json!({"finance": {"result": null, "error": {"code": "Not Found", "description": "Quote not found"}}});
        assert_eq!(check_envelope(&not_found).unwrap(), Envelope::NotFound);

        let failed = json!({"finance": {"result": null, "error": {"code": "Unauthorized", "description": "Invalid Crumb"}}});
        assert!(matches!(check_envelope(&failed), Err(DataError::Other(msg)) if msg.contains("Invalid Crumb")));
    }

    #[test]
    fn test_raw_value() {
        assert_eq!(raw_value(&json!({"raw": 1.2, "fmt": "1.20"})), Some(json!(1.2)));
        assert_eq!(raw_value(&json!({"fmt": "N/A"})), Some(json!("N/A")));
        assert_eq!(raw_value(&json!({})), None);
        assert_eq!(raw_value(&json!("Technology")), Some(json!("Technology")));
        assert_eq!(raw_f64(Some(&json!({"raw": 6000, "fmt": "6k"}))), Some(6000.0));
        assert_eq!(
            fmt_string(Some(&json!({"raw": 1688083200, "fmt": "2023-06-30"}))),
            Some("2023-06-30".to_string())
        );
    }
}
