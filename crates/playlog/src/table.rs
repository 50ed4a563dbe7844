//! Shared shape of every output table.
//!
//! Dimensions and facts are built as typed row vectors and only become Arrow
//! batches when handed to the writer.

use arrow::array::RecordBatch;
use arrow::error::ArrowError;
use arrow_schema::SchemaRef;
use chrono::{DateTime, Utc};

/// A row type of one output table.
pub trait StarTable: Sized {
    /// Directory of the table under the output root.
    const NAME: &'static str;

    /// Hive partition columns, outermost first.
    const PARTITION_COLUMNS: &'static [&'static str];

    /// Arrow schema of the full table, partition columns included.
    fn schema() -> SchemaRef;

    /// Convert rows to a single batch matching [`StarTable::schema`].
    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError>;
}

/// Bit pattern of a float for equality and hashing. `-0.0` and `0.0` share a key.
pub(crate) fn float_key(value: Option<f64>) -> Option<u64> {
    value.map(|v| if v == 0.0 { 0.0f64 } else { v }.to_bits())
}

/// UTC instant of an event timestamp, truncated to whole seconds.
///
/// Returns `None` when the timestamp is outside the representable range.
pub fn start_time(epoch_ts_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_ts_ms.div_euclid(1000), 0)
}

/// Microseconds since the epoch, as stored in `start_time` columns.
pub(crate) fn timestamp_micros(time: &DateTime<Utc>) -> i64 {
    time.timestamp() * 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_float_key_normalizes_negative_zero() {
        assert_eq!(float_key(Some(-0.0)), float_key(Some(0.0)));
        assert_ne!(float_key(Some(121.5)), float_key(Some(121.50001)));
        assert_eq!(float_key(None), None);
    }

    #[test]
    fn test_start_time_floors_to_seconds() {
        let t = start_time(1541121934796).unwrap();
        assert_eq!(t.timestamp(), 1541121934);
        assert_eq!((t.year(), t.month(), t.day()), (2018, 11, 2));
        assert_eq!((t.hour(), t.minute(), t.second()), (1, 25, 34));
    }

    #[test]
    fn test_start_time_floors_negative_timestamps() {
        assert_eq!(start_time(-1).unwrap().timestamp(), -1);
        assert_eq!(start_time(-1000).unwrap().timestamp(), -1);
        assert_eq!(start_time(999).unwrap().timestamp(), 0);
    }

    #[test]
    fn test_start_time_out_of_range() {
        assert!(start_time(i64::MAX).is_none());
    }
}
