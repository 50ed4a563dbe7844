use std::sync::{Arc, LazyLock};

use arrow::array::{
    ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray,
};
use arrow::error::ArrowError;
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Datelike, Timelike, Utc};
use indexmap::IndexMap;
use tracing::warn;

use crate::model::EventRecord;
use crate::table::{StarTable, start_time, timestamp_micros};

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("ts", DataType::Int64, false),
        Field::new(
            "start_time",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("hour", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
        Field::new("week", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("year", DataType::Int32, false),
        Field::new("weekday", DataType::Utf8, false),
    ]))
});

/// One row of the `time` dimension, keyed by the raw event timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub ts: i64,
    pub start_time: DateTime<Utc>,
    pub hour: i32,
    pub day: i32,
    /// ISO 8601 week number.
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// English abbreviation, "Mon" through "Sun".
    pub weekday: String,
}

impl TimeRow {
    /// Derive the calendar fields of a millisecond timestamp in UTC.
    pub fn from_epoch_ms(ts: i64) -> Option<Self> {
        let start = start_time(ts)?;
        Some(Self {
            ts,
            start_time: start,
            hour: start.hour() as i32,
            day: start.day() as i32,
            week: start.iso_week().week() as i32,
            month: start.month() as i32,
            year: start.year(),
            weekday: start.format("%a").to_string(),
        })
    }
}

/// One row per distinct event timestamp, in first-encounter order.
pub fn build_time(events: &[EventRecord]) -> Vec<TimeRow> {
    let mut by_ts: IndexMap<i64, TimeRow> = IndexMap::new();
    for event in events {
        if by_ts.contains_key(&event.epoch_ts_ms) {
            continue;
        }
        match TimeRow::from_epoch_ms(event.epoch_ts_ms) {
            Some(row) => {
                by_ts.insert(event.epoch_ts_ms, row);
            }
            None => warn!(ts = event.epoch_ts_ms, "Skipping unrepresentable timestamp"),
        }
    }
    by_ts.into_values().collect()
}

impl StarTable for TimeRow {
    const NAME: &'static str = "time";
    const PARTITION_COLUMNS: &'static [&'static str] = &["year", "month"];

    fn schema() -> SchemaRef {
        SCHEMA.clone()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let int = |f: fn(&TimeRow) -> i32| -> ArrayRef {
            Arc::new(Int32Array::from_iter_values(rows.iter().map(f)))
        };
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.ts))),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    rows.iter().map(|r| timestamp_micros(&r.start_time)),
                )
                .with_timezone("UTC"),
            ),
            int(|r| r.hour),
            int(|r| r.day),
            int(|r| r.week),
            int(|r| r.month),
            int(|r| r.year),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.weekday.as_str()),
            )),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::dimension::tests::event;

    #[test]
    fn test_calendar_fields_in_utc() {
        let row = TimeRow::from_epoch_ms(1541121934796).unwrap();

        assert_eq!(row.start_time.timestamp(), 1541121934);
        assert_eq!(row.hour, 1);
        assert_eq!(row.day, 2);
        assert_eq!(row.week, 44);
        assert_eq!(row.month, 11);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, "Fri");
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        // 2021-01-01 is a Friday in ISO week 53 of 2020.
        let row = TimeRow::from_epoch_ms(1609459200000).unwrap();
        assert_eq!(row.year, 2021);
        assert_eq!(row.week, 53);
        assert_eq!(row.weekday, "Fri");
    }

    #[test]
    fn test_one_row_per_timestamp() {
        let events = vec![
            event("1", "Halo", "Beyoncé", 121.5, 1541121934796),
            event("2", "Yellow", "Coldplay", 266.0, 1541121934796),
            event("1", "Halo", "Beyoncé", 121.5, 1541121934797),
        ];

        let rows = build_time(&events);
        assert_eq!(rows.len(), 2);
        let keys: HashSet<_> = rows.iter().map(|r| r.ts).collect();
        assert_eq!(keys.len(), rows.len());
        // Same second, distinct milliseconds.
        assert_eq!(rows[0].start_time, rows[1].start_time);
    }

    #[test]
    fn test_record_batch_uses_utc_timestamps() {
        let rows = build_time(&[event("1", "Halo", "Beyoncé", 121.5, 1541121934796)]);
        let batch = TimeRow::to_record_batch(&rows).unwrap();

        let start = batch
            .column(1)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        assert_eq!(start.value(0), 1541121934 * 1_000_000);
        assert_eq!(batch.schema(), TimeRow::schema());
    }
}
