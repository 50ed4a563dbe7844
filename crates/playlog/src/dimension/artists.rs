use std::sync::{Arc, LazyLock};

use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::error::ArrowError;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::model::WorkRecord;
use crate::table::StarTable;

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("name", DataType::Utf8, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("longitude", DataType::Float64, true),
        Field::new("latitude", DataType::Float64, true),
    ]))
});

/// One row of the `artists` dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

/// One row per distinct `artist_id`, keeping the first occurrence in catalog order.
///
/// Works without an artist id share a single null key.
pub fn build_artists(works: &[WorkRecord]) -> Vec<ArtistRow> {
    let mut by_id: IndexMap<Option<&str>, ArtistRow> = IndexMap::new();
    for work in works {
        if let Entry::Vacant(slot) = by_id.entry(work.artist_id.as_deref()) {
            slot.insert(ArtistRow {
                artist_id: work.artist_id.clone(),
                name: work.artist_name.clone(),
                location: work.artist_location.clone(),
                longitude: work.artist_longitude,
                latitude: work.artist_latitude,
            });
        }
    }
    by_id.into_values().collect()
}

impl StarTable for ArtistRow {
    const NAME: &'static str = "artists";
    const PARTITION_COLUMNS: &'static [&'static str] = &[];

    fn schema() -> SchemaRef {
        SCHEMA.clone()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.artist_id.as_deref()),
            )),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.name.as_deref()))),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.location.as_deref()),
            )),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.longitude))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.latitude))),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::dimension::tests::work;

    #[test]
    fn test_one_row_per_artist_id() {
        let mut a = work("S1", "Halo", "A1", "Beyoncé", 121.5);
        a.artist_location = Some("Houston".to_string());
        let mut b = work("S2", "Crazy in Love", "A1", "Beyonce", 236.0);
        b.artist_location = Some("Texas".to_string());
        let c = work("S3", "Yellow", "A2", "Coldplay", 266.0);

        let artists = build_artists(&[a, b, c]);

        assert_eq!(artists.len(), 2);
        let ids: HashSet<_> = artists.iter().map(|r| r.artist_id.clone()).collect();
        assert_eq!(ids.len(), artists.len());
        assert_eq!(artists[0].name.as_deref(), Some("Beyoncé"));
        assert_eq!(artists[0].location.as_deref(), Some("Houston"));
    }

    #[test]
    fn test_null_artist_ids_share_one_row() {
        let mut a = work("S1", "Intro", "A1", "Unknown", 10.0);
        a.artist_id = None;
        let mut b = work("S2", "Outro", "A1", "Other", 12.0);
        b.artist_id = None;

        let artists = build_artists(&[a, b]);
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].name.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let works = vec![
            work("S1", "One", "A1", "First", 1.0),
            work("S2", "Two", "A1", "Second", 2.0),
        ];
        assert_eq!(build_artists(&works), build_artists(&works));
    }
}
