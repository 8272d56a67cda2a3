use dcf_data_core::{PriceSeries, Result};

use super::{Codec, read_csv, write_csv};

/// CSV codec for price series: `Date` leading column, one row per bar.
///
/// Dates are written as `YYYY-MM-DD` and parsed back into a `Date` column.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeIndexedCsv;

impl Codec for TimeIndexedCsv {
    type Record = PriceSeries;

    fn encode(record: &PriceSeries) -> Result<Vec<u8>> {
        write_csv(record.frame())
    }

    fn decode(bytes: &[u8]) -> Result<PriceSeries> {
        PriceSeries::normalize(read_csv(bytes, true)?)
    }
}
