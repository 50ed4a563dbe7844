//! Typed raw records produced by the loaders.
//!
//! Field names here are the semantic names; the mapping from wire names lives
//! in the `from_validated` constructors and must not change, since existing
//! datasets depend on it.

use crate::schema::ValidatedRecord;

/// One entry of the song catalog (`song_data`).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRecord {
    /// `song_id` on the wire. Never null.
    pub work_id: String,
    pub title: Option<String>,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub artist_location: Option<String>,
    pub artist_longitude: Option<f64>,
    pub artist_latitude: Option<f64>,
    /// Seconds.
    pub duration: Option<f64>,
    /// `year` on the wire; 0 means unknown.
    pub release_year: Option<i64>,
    /// `num_songs` on the wire.
    pub play_count_hint: Option<i64>,
}

impl WorkRecord {
    /// Build from a record validated against the catalog schema.
    ///
    /// Returns `None` only if the essential `song_id` is absent, which schema
    /// validation already rules out.
    pub fn from_validated(record: &ValidatedRecord) -> Option<Self> {
        Some(Self {
            work_id: record.text("song_id")?,
            title: record.text("title"),
            artist_id: record.text("artist_id"),
            artist_name: record.text("artist_name"),
            artist_location: record.text("artist_location"),
            artist_longitude: record.double("artist_longitude"),
            artist_latitude: record.double("artist_latitude"),
            duration: record.double("duration"),
            release_year: record.long("year"),
            play_count_hint: record.long("num_songs"),
        })
    }
}

/// One line of the listening log (`log_data`).
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// `page` on the wire.
    pub page_action: String,
    /// `userId` on the wire.
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub session_id: Option<i64>,
    pub item_in_session: Option<i64>,
    /// `song` on the wire.
    pub song_title: Option<String>,
    /// `artist` on the wire.
    pub artist_name: Option<String>,
    /// Seconds.
    pub length: Option<f64>,
    /// `level` on the wire.
    pub subscription_level: Option<String>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    /// `ts` on the wire, milliseconds since the Unix epoch.
    pub epoch_ts_ms: i64,
    pub status: Option<i64>,
}

impl EventRecord {
    /// Build from a record validated against the event schema.
    pub fn from_validated(record: &ValidatedRecord) -> Option<Self> {
        Some(Self {
            page_action: record.text("page")?,
            user_id: record.text("userId"),
            first_name: record.text("firstName"),
            last_name: record.text("lastName"),
            gender: record.text("gender"),
            session_id: record.long("sessionId"),
            item_in_session: record.long("itemInSession"),
            song_title: record.text("song"),
            artist_name: record.text("artist"),
            length: record.double("length"),
            subscription_level: record.text("level"),
            location: record.text("location"),
            user_agent: record.text("userAgent"),
            epoch_ts_ms: record.long("ts")?,
            status: record.long("status"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaCatalog, SourceKind};

    #[test]
    fn test_work_record_wire_mapping() {
        let line = r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": 35.14968,
            "artist_longitude": -90.04892, "artist_location": "Memphis, TN",
            "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480",
            "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#;
        let validated = SchemaCatalog::schema(SourceKind::Catalog)
            .decode_line(1, line)
            .unwrap();
        let work = WorkRecord::from_validated(&validated).unwrap();

        assert_eq!(work.work_id, "SOMZWCG12A8C13C480");
        assert_eq!(work.artist_name.as_deref(), Some("Casual"));
        assert_eq!(work.artist_latitude, Some(35.14968));
        assert_eq!(work.release_year, Some(0));
        assert_eq!(work.play_count_hint, Some(1));
        assert_eq!(work.duration, Some(218.93179));
    }

    #[test]
    fn test_event_record_wire_mapping() {
        let line = r#"{"artist": "Des'ree", "auth": "Logged In", "firstName": "Kaylee",
            "gender": "F", "itemInSession": 1, "lastName": "Summers", "length": 246.30812,
            "level": "free", "location": "Phoenix-Mesa-Scottsdale, AZ", "method": "PUT",
            "page": "NextSong", "registration": 1540344794796.0, "sessionId": 139,
            "song": "You Gotta Be", "status": 200, "ts": 1541106106796,
            "userAgent": "Mozilla/5.0", "userId": "8"}"#;
        let validated = SchemaCatalog::schema(SourceKind::Events)
            .decode_line(1, line)
            .unwrap();
        let event = EventRecord::from_validated(&validated).unwrap();

        assert_eq!(event.page_action, "NextSong");
        assert_eq!(event.user_id.as_deref(), Some("8"));
        assert_eq!(event.first_name.as_deref(), Some("Kaylee"));
        assert_eq!(event.session_id, Some(139));
        assert_eq!(event.item_in_session, Some(1));
        assert_eq!(event.song_title.as_deref(), Some("You Gotta Be"));
        assert_eq!(event.artist_name.as_deref(), Some("Des'ree"));
        assert_eq!(event.length, Some(246.30812));
        assert_eq!(event.subscription_level.as_deref(), Some("free"));
        assert_eq!(event.epoch_ts_ms, 1541106106796);
        assert_eq!(event.status, Some(200));
    }
}
