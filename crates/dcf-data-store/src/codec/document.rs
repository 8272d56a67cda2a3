use dcf_data_core::{CompanyInfo, DataError, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use super::Codec;

/// JSON codec for company info documents.
///
/// Documents are written as a pretty-printed object with a four-space indent.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocument;

impl Codec for JsonDocument {
    type Record = CompanyInfo;

    fn encode(record: &CompanyInfo) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        record
            .serialize(&mut serializer)
            .map_err(|e| DataError::Other(format!("JSON encode failed: {e}")))?;
        Ok(buf)
    }

    fn decode(bytes: &[u8]) -> Result<CompanyInfo> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| DataError::Parse(format!("JSON decode failed: {e}")))?;
        match value {
            Value::Object(map) => Ok(CompanyInfo::new(map)),
            other => Err(DataError::Parse(format!(
                "expected a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
