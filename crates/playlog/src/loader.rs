//! Loaders that turn raw sources into typed record tables.
//!
//! Loading is a pure function of the source content: calling `load` twice on
//! the same source yields the same records in the same order.

use std::sync::Arc;
use std::time::Instant;

use futures::TryStreamExt;
use snafu::prelude::*;
use tracing::info;

use playlog_core::emit;
use playlog_core::metrics::events::{RecordsFiltered, RecordsLoaded, StageCompleted};

use crate::error::{PipelineError, SourceUnavailableSnafu, TaskJoinSnafu};
use crate::model::{EventRecord, WorkRecord};
use crate::schema::{SchemaCatalog, SourceKind, ValidatedRecord};
use crate::source::{NdjsonReader, RecordSource, SourceDocument};
use crate::table::start_time;

/// Page action that marks a song play in the listening log.
pub const DEFAULT_PLAY_ACTION: &str = "NextSong";

/// Counters describing one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub documents: usize,
    pub lines: usize,
    /// Records handed downstream.
    pub loaded: usize,
    /// Lines dropped as malformed.
    pub rejected: usize,
    /// Valid records dropped by the loader's filter.
    pub filtered: usize,
    /// Optional fields reset to null during coercion.
    pub nulled_fields: usize,
}

/// Records produced by a loader, with their load statistics.
#[derive(Debug, Clone)]
pub struct LoadedTable<T> {
    pub records: Vec<T>,
    pub stats: LoadStats,
}

/// Stream the documents of a source and decode each off the async runtime.
///
/// `convert` maps each validated record to its typed form, or `None` to drop it.
/// Only the documents in flight are held in memory, never the whole source.
async fn load_with<T, F>(
    source: &dyn RecordSource,
    kind: SourceKind,
    convert: F,
) -> Result<LoadedTable<T>, PipelineError>
where
    T: Send + 'static,
    F: Fn(&ValidatedRecord) -> Option<T> + Send + Sync + 'static,
{
    let start = Instant::now();
    let stage = kind.as_str();
    let mut documents = source
        .documents()
        .await
        .context(SourceUnavailableSnafu { stage })?;

    let convert = Arc::new(convert);
    let mut table = LoadedTable {
        records: Vec::new(),
        stats: LoadStats::default(),
    };
    while let Some(document) = documents
        .try_next()
        .await
        .context(SourceUnavailableSnafu { stage })?
    {
        let convert = Arc::clone(&convert);
        let decoded =
            tokio::task::spawn_blocking(move || decode_document(kind, &document, &*convert))
                .await
                .context(TaskJoinSnafu)?;
        table.append(decoded);
    }

    emit!(RecordsLoaded {
        count: table.stats.loaded as u64,
        source: stage,
    });
    if table.stats.filtered > 0 {
        emit!(RecordsFiltered {
            count: table.stats.filtered as u64,
            source: stage,
        });
    }
    emit!(StageCompleted {
        stage,
        duration: start.elapsed(),
    });

    info!(
        source = stage,
        location = %source.describe(),
        documents = table.stats.documents,
        loaded = table.stats.loaded,
        rejected = table.stats.rejected,
        filtered = table.stats.filtered,
        nulled_fields = table.stats.nulled_fields,
        "Loaded source"
    );

    Ok(table)
}

impl<T> LoadedTable<T> {
    fn append(&mut self, other: LoadedTable<T>) {
        self.records.extend(other.records);
        self.stats.documents += other.stats.documents;
        self.stats.lines += other.stats.lines;
        self.stats.loaded += other.stats.loaded;
        self.stats.rejected += other.stats.rejected;
        self.stats.filtered += other.stats.filtered;
        self.stats.nulled_fields += other.stats.nulled_fields;
    }
}

fn decode_document<T, F>(
    kind: SourceKind,
    document: &SourceDocument,
    convert: &F,
) -> LoadedTable<T>
where
    F: Fn(&ValidatedRecord) -> Option<T>,
{
    let reader = NdjsonReader::new(SchemaCatalog::schema(kind));
    let mut records = Vec::new();
    let mut filtered = 0;

    let mut keep = |record: ValidatedRecord| match convert(&record) {
        Some(typed) => records.push(typed),
        None => filtered += 1,
    };
    let decoded = reader.read_document(document, &mut keep);

    LoadedTable {
        stats: LoadStats {
            documents: 1,
            lines: decoded.lines,
            loaded: records.len(),
            rejected: decoded.rejected,
            filtered,
            nulled_fields: decoded.nulled_fields,
        },
        records,
    }
}

/// Loads the song catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn new() -> Self {
        Self
    }

    pub async fn load(
        &self,
        source: &dyn RecordSource,
    ) -> Result<LoadedTable<WorkRecord>, PipelineError> {
        load_with(source, SourceKind::Catalog, WorkRecord::from_validated).await
    }
}

/// Loads the listening log, keeping only play events.
///
/// Events whose timestamp cannot be represented as a UTC instant are
/// filtered along with the non-play actions.
#[derive(Debug, Clone)]
pub struct EventLoader {
    play_action: String,
}

impl Default for EventLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PLAY_ACTION)
    }
}

impl EventLoader {
    pub fn new(play_action: impl Into<String>) -> Self {
        Self {
            play_action: play_action.into(),
        }
    }

    pub fn play_action(&self) -> &str {
        &self.play_action
    }

    pub async fn load(
        &self,
        source: &dyn RecordSource,
    ) -> Result<LoadedTable<EventRecord>, PipelineError> {
        let play_action = self.play_action.clone();
        load_with(source, SourceKind::Events, move |record| {
            EventRecord::from_validated(record).filter(|e| {
                e.page_action == play_action && start_time(e.epoch_ts_ms).is_some()
            })
        })
        .await
    }
}
