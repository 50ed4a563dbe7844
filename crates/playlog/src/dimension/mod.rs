//! Dimension tables derived from the loaded sources.
//!
//! Every derivation is a pure function of its input slice and preserves
//! first-encounter order, so a fixed input always yields the same rows.

mod artists;
mod songs;
mod time;
mod users;

pub use artists::{ArtistRow, build_artists};
pub use songs::{SongRow, build_songs};
pub use time::{TimeRow, build_time};
pub use users::{UserRow, build_users};

use tracing::info;

use crate::model::{EventRecord, WorkRecord};

/// The four dimension tables of one run.
#[derive(Debug, Clone, Default)]
pub struct Dimensions {
    pub songs: Vec<SongRow>,
    pub artists: Vec<ArtistRow>,
    pub users: Vec<UserRow>,
    pub time: Vec<TimeRow>,
}

/// Derives the dimension tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionBuilder;

impl DimensionBuilder {
    /// Songs and artists come from the catalog, users and time from play events.
    pub fn build(&self, works: &[WorkRecord], events: &[EventRecord]) -> Dimensions {
        let dimensions = Dimensions {
            songs: build_songs(works),
            artists: build_artists(works),
            users: build_users(events),
            time: build_time(events),
        };

        info!(
            songs = dimensions.songs.len(),
            artists = dimensions.artists.len(),
            users = dimensions.users.len(),
            time = dimensions.time.len(),
            "Built dimension tables"
        );
        dimensions
    }
}
