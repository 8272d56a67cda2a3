//! Record codecs.
//!
//! A [`Codec`] converts one record shape to and from the bytes of a cache
//! artifact. The router picks the codec statically from the data kind:
//!
//! | record              | codec               | encoding |
//! |---------------------|---------------------|----------|
//! | price series        | [`TimeIndexedCsv`]  | CSV      |
//! | statement table     | [`DateColumnedCsv`] | CSV      |
//! | holders table       | [`RelationalCsv`]   | CSV      |
//! | company info        | [`JsonDocument`]    | JSON     |

use dcf_data_core::{DataError, Result};
use polars::prelude::*;
use std::io::Cursor;

mod date_columned;
mod document;
mod relational;
mod time_indexed;

pub use date_columned::DateColumnedCsv;
pub use document::JsonDocument;
pub use relational::RelationalCsv;
pub use time_indexed::TimeIndexedCsv;

/// Converts a record to and from artifact bytes.
pub trait Codec {
    /// The record shape handled by this codec.
    type Record;

    /// Encodes a record.
    ///
    /// # Errors
    /// Returns [`DataError::Other`] if the record cannot be serialized.
    fn encode(record: &Self::Record) -> Result<Vec<u8>>;

    /// Decodes artifact bytes.
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if the bytes are structurally malformed.
    fn decode(bytes: &[u8]) -> Result<Self::Record>;
}

/// Writes a frame as CSV with a header row.
pub(crate) fn write_csv(frame: &DataFrame) -> Result<Vec<u8>> {
    let mut frame = frame.clone();
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut frame)
        .map_err(|e| DataError::Other(format!("CSV encode failed: {e}")))?;
    Ok(buf)
}

/// Reads CSV bytes with a header row, inferring types from every row.
pub(crate) fn read_csv(bytes: &[u8], try_parse_dates: bool) -> Result<DataFrame> {
    std::str::from_utf8(bytes).map_err(|e| DataError::Parse(format!("CSV is not UTF-8: {e}")))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_try_parse_dates(try_parse_dates))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| DataError::Parse(format!("CSV decode failed: {e}")))
}

/// Casts the columns matching `select` (by position) to `Float64`.
///
/// An all-null numeric column is written as empty cells and read back as
/// `String`; this restores its numeric type.
pub(crate) fn cast_to_float(
    frame: &DataFrame,
    select: impl Fn(usize, &Column) -> bool,
) -> Result<DataFrame> {
    frame
        .get_columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            if select(i, column) && column.dtype() != &DataType::Float64 {
                column.cast(&DataType::Float64)
            } else {
                Ok(column.clone())
            }
        })
        .collect::<PolarsResult<Vec<Column>>>()
        .and_then(DataFrame::new)
        .map_err(|e| DataError::Parse(format!("CSV decode failed: {e}")))
}

/// Returns true for a `String` column holding only nulls.
pub(crate) fn is_null_text(column: &Column) -> bool {
    column.dtype() == &DataType::String && column.null_count() == column.len()
}
