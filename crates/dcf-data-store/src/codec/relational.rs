use dcf_data_core::{RelationalTable, Result};

use super::{Codec, cast_to_float, is_null_text, read_csv, write_csv};

/// CSV codec for holders and recommendations tables.
///
/// No column is treated as an index and no values are reinterpreted as dates.
/// Columns that come back entirely empty are read as `Float64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalCsv;

impl Codec for RelationalCsv {
    type Record = RelationalTable;

    fn encode(record: &RelationalTable) -> Result<Vec<u8>> {
        write_csv(record.frame())
    }

    fn decode(bytes: &[u8]) -> Result<RelationalTable> {
        let frame = read_csv(bytes, false)?;
        cast_to_float(&frame, |_, column| is_null_text(column)).map(RelationalTable::new)
    }
}
