use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::error::ArrowError;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use indexmap::IndexSet;

use crate::model::WorkRecord;
use crate::table::{StarTable, float_key};

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, true),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("year", DataType::Int64, true),
        Field::new("duration", DataType::Float64, true),
        Field::new("artist", DataType::Utf8, true),
    ]))
});

/// One row of the `songs` dimension.
///
/// `artist` carries the artist name and is used only as a partition column.
#[derive(Debug, Clone)]
pub struct SongRow {
    pub song_id: String,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i64>,
    pub duration: Option<f64>,
    pub artist: Option<String>,
}

impl SongRow {
    fn from_work(work: &WorkRecord) -> Self {
        Self {
            song_id: work.work_id.clone(),
            title: work.title.clone(),
            artist_id: work.artist_id.clone(),
            year: work.release_year,
            duration: work.duration,
            artist: work.artist_name.clone(),
        }
    }
}

impl PartialEq for SongRow {
    fn eq(&self, other: &Self) -> bool {
        self.song_id == other.song_id
            && self.title == other.title
            && self.artist_id == other.artist_id
            && self.year == other.year
            && float_key(self.duration) == float_key(other.duration)
            && self.artist == other.artist
    }
}

impl Eq for SongRow {}

impl Hash for SongRow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.song_id.hash(state);
        self.title.hash(state);
        self.artist_id.hash(state);
        self.year.hash(state);
        float_key(self.duration).hash(state);
        self.artist.hash(state);
    }
}

/// Project the catalog onto song rows, dropping exact duplicates.
pub fn build_songs(works: &[WorkRecord]) -> Vec<SongRow> {
    works
        .iter()
        .map(SongRow::from_work)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

impl StarTable for SongRow {
    const NAME: &'static str = "songs";
    const PARTITION_COLUMNS: &'static [&'static str] = &["year", "artist"];

    fn schema() -> SchemaRef {
        SCHEMA.clone()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.song_id.as_str()),
            )),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.title.as_deref()))),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.artist_id.as_deref()),
            )),
            Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.year))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.duration))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.artist.as_deref()))),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }
}
