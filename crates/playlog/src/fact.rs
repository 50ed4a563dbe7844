//! The `songplays` fact table.
//!
//! Each play event is matched against the catalog on the exact
//! (title, artist name, duration) triple. Events without a match are kept
//! with null song and artist ids.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use arrow::array::{
    ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray,
};
use arrow::error::ArrowError;
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info, warn};

use playlog_core::emit;
use playlog_core::metrics::events::{JoinCompleted, JoinStatus};

use crate::model::{EventRecord, WorkRecord};
use crate::table::{StarTable, float_key, start_time, timestamp_micros};

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new(
            "start_time",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("user_id", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("song_id", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("session_id", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("user_agent", DataType::Utf8, true),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
    ]))
});

/// One row of the `songplays` fact table.
#[derive(Debug, Clone, PartialEq)]
pub struct SongPlayFact {
    pub start_time: DateTime<Utc>,
    pub user_id: Option<String>,
    pub level: Option<String>,
    /// Null when no catalog entry matched.
    pub song_id: Option<String>,
    /// Null when no catalog entry matched.
    pub artist_id: Option<String>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    pub year: i32,
    pub month: i32,
}

/// Outcome counters of one join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactStats {
    pub rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Matched events whose key hit more than one catalog entry.
    pub ambiguous: usize,
}

type JoinKey<'a> = (&'a str, &'a str, u64);

/// Catalog entries matching a key: the first in catalog order and the total.
struct Candidates<'a> {
    first: &'a WorkRecord,
    count: usize,
}

fn join_key<'a>(
    title: Option<&'a str>,
    artist: Option<&'a str>,
    duration: Option<f64>,
) -> Option<JoinKey<'a>> {
    Some((title?, artist?, float_key(duration)?))
}

/// Builds the fact table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactBuilder;

impl FactBuilder {
    /// Left-outer join of play events against the catalog.
    ///
    /// Equality is exact on all three key fields. Null fields never match.
    pub fn build(
        &self,
        events: &[EventRecord],
        works: &[WorkRecord],
    ) -> (Vec<SongPlayFact>, FactStats) {
        let mut index: HashMap<JoinKey<'_>, Candidates<'_>> = HashMap::new();
        for work in works {
            let key = join_key(
                work.title.as_deref(),
                work.artist_name.as_deref(),
                work.duration,
            );
            let Some(key) = key else {
                continue;
            };
            index
                .entry(key)
                .and_modify(|c| c.count += 1)
                .or_insert(Candidates { first: work, count: 1 });
        }

        let mut stats = FactStats::default();
        let mut facts = Vec::with_capacity(events.len());

        for event in events {
            let Some(start) = start_time(event.epoch_ts_ms) else {
                warn!(
                    ts = event.epoch_ts_ms,
                    "Skipping event with unrepresentable timestamp"
                );
                continue;
            };

            let matched = join_key(
                event.song_title.as_deref(),
                event.artist_name.as_deref(),
                event.length,
            )
            .and_then(|key| index.get(&key));

            match matched {
                Some(candidates) => {
                    stats.matched += 1;
                    if candidates.count > 1 {
                        stats.ambiguous += 1;
                        debug!(
                            song = ?event.song_title,
                            artist = ?event.artist_name,
                            candidates = candidates.count,
                            chosen = %candidates.first.work_id,
                            "Ambiguous catalog match"
                        );
                    }
                }
                None => stats.unmatched += 1,
            }

            let work = matched.map(|c| c.first);
            facts.push(SongPlayFact {
                start_time: start,
                user_id: event.user_id.clone(),
                level: event.subscription_level.clone(),
                song_id: work.map(|w| w.work_id.clone()),
                artist_id: work.and_then(|w| w.artist_id.clone()),
                session_id: event.session_id,
                location: event.location.clone(),
                user_agent: event.user_agent.clone(),
                year: start.year(),
                month: start.month() as i32,
            });
        }
        stats.rows = facts.len();

        emit!(JoinCompleted {
            status: JoinStatus::Matched,
            count: stats.matched as u64,
        });
        emit!(JoinCompleted {
            status: JoinStatus::Unmatched,
            count: stats.unmatched as u64,
        });
        emit!(JoinCompleted {
            status: JoinStatus::Ambiguous,
            count: stats.ambiguous as u64,
        });
        info!(
            rows = stats.rows,
            matched = stats.matched,
            unmatched = stats.unmatched,
            ambiguous = stats.ambiguous,
            "Built songplays fact table"
        );

        (facts, stats)
    }
}

impl StarTable for SongPlayFact {
    const NAME: &'static str = "songplays";
    const PARTITION_COLUMNS: &'static [&'static str] = &["year", "month"];

    fn schema() -> SchemaRef {
        SCHEMA.clone()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    rows.iter().map(|r| timestamp_micros(&r.start_time)),
                )
                .with_timezone("UTC"),
            ),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.user_id.as_deref()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.level.as_deref()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.song_id.as_deref()))),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.artist_id.as_deref()),
            )),
            Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.session_id))),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.location.as_deref()),
            )),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.user_agent.as_deref()),
            )),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.month))),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }
}
