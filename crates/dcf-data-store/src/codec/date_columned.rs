use dcf_data_core::{Result, StatementTable};
use tracing::debug;

use super::{Codec, cast_to_float, read_csv, write_csv};

/// CSV codec for statement tables: `line_item` leading column, one column per
/// report date.
///
/// On decode the headers are reinterpreted as dates when all of them parse;
/// otherwise they are kept as labels. Period columns are always `Float64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateColumnedCsv;

impl Codec for DateColumnedCsv {
    type Record = StatementTable;

    fn encode(record: &StatementTable) -> Result<Vec<u8>> {
        write_csv(record.frame())
    }

    fn decode(bytes: &[u8]) -> Result<StatementTable> {
        let frame = cast_to_float(&read_csv(bytes, false)?, |i, _| i > 0)?;
        let table = StatementTable::from_frame(frame);
        if !table.periods().is_dates() {
            debug!("statement headers are not dates, keeping labels");
        }
        Ok(table)
    }
}
