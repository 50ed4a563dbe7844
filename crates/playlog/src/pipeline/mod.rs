//! End-to-end batch run.
//!
//! Both sources are loaded concurrently, the star schema is derived in
//! memory, and the five tables are written in parallel. The first failing
//! write aborts the others.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::RecordBatch;
use snafu::prelude::*;
use tokio::task::JoinSet;
use tracing::{error, info};

use playlog_core::emit;
use playlog_core::metrics::events::StageCompleted;
use playlog_core::{ParquetCompression, StorageProvider};

use crate::config::Config;
use crate::dimension::{DimensionBuilder, Dimensions};
use crate::error::{BatchBuildSnafu, EncodeSnafu, PipelineError, StorageSnafu, TaskJoinSnafu};
use crate::fact::{FactBuilder, FactStats, SongPlayFact};
use crate::loader::{CatalogLoader, DEFAULT_PLAY_ACTION, EventLoader, LoadStats};
use crate::model::{EventRecord, WorkRecord};
use crate::sink::{ParquetEncoder, PartitionedWriter, TableSink, TableWriteSummary};
use crate::source::{RecordSource, StorageSource};
use crate::table::StarTable;

/// Tunables of a run that do not depend on where data lives.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub play_action: String,
    pub compression: ParquetCompression,
    pub max_rows_per_file: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            play_action: DEFAULT_PLAY_ACTION.to_string(),
            compression: ParquetCompression::default(),
            max_rows_per_file: 1_000_000,
        }
    }
}

/// Every table of one run, before serialization.
#[derive(Debug, Clone, Default)]
pub struct StarSchema {
    pub dimensions: Dimensions,
    pub songplays: Vec<SongPlayFact>,
    pub fact_stats: FactStats,
}

impl StarSchema {
    /// Derive the dimensions and the fact table from loaded records.
    pub fn build(works: &[WorkRecord], events: &[EventRecord]) -> Self {
        let dimensions = DimensionBuilder.build(works, events);
        let (songplays, fact_stats) = FactBuilder.build(events, works);
        Self {
            dimensions,
            songplays,
            fact_stats,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub catalog: LoadStats,
    pub events: LoadStats,
    pub fact: FactStats,
    /// One entry per table, sorted by table name.
    pub tables: Vec<TableWriteSummary>,
}

impl RunSummary {
    pub fn table(&self, name: &str) -> Option<&TableWriteSummary> {
        self.tables.iter().find(|t| t.table == name)
    }
}

struct TableBatch {
    name: &'static str,
    batch: RecordBatch,
    partition_columns: &'static [&'static str],
}

fn table_batch<T: StarTable>(rows: &[T]) -> Result<TableBatch, PipelineError> {
    let batch = T::to_record_batch(rows)
        .context(BatchBuildSnafu)
        .context(EncodeSnafu { table: T::NAME })?;
    Ok(TableBatch {
        name: T::NAME,
        batch,
        partition_columns: T::PARTITION_COLUMNS,
    })
}

/// The star-schema batch job.
pub struct Pipeline {
    catalog: Arc<dyn RecordSource>,
    events: Arc<dyn RecordSource>,
    catalog_loader: CatalogLoader,
    event_loader: EventLoader,
    writer: PartitionedWriter,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("catalog", &self.catalog.describe())
            .field("events", &self.events.describe())
            .field("play_action", &self.event_loader.play_action())
            .field("writer", &self.writer)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn RecordSource>,
        events: Arc<dyn RecordSource>,
        sink: Arc<dyn TableSink>,
        options: PipelineOptions,
    ) -> Self {
        let encoder = ParquetEncoder::new(options.compression);
        Self {
            catalog,
            events,
            catalog_loader: CatalogLoader::new(),
            event_loader: EventLoader::new(options.play_action),
            writer: PartitionedWriter::new(sink, encoder, options.max_rows_per_file),
        }
    }

    /// Build a pipeline over object storage from configuration.
    ///
    /// Input locations must exist; the output root is created if needed.
    pub async fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let catalog = &config.sources.catalog;
        let events = &config.sources.events;

        let catalog_storage =
            StorageProvider::for_existing_url(&catalog.path, catalog.storage_options.clone())
                .await
                .context(StorageSnafu { url: &catalog.path })?;
        let events_storage =
            StorageProvider::for_existing_url(&events.path, events.storage_options.clone())
                .await
                .context(StorageSnafu { url: &events.path })?;
        let sink = StorageProvider::for_url_with_options(
            &config.sink.path,
            config.sink.storage_options.clone(),
        )
        .await
        .context(StorageSnafu {
            url: &config.sink.path,
        })?;

        let catalog_source = StorageSource::new(
            Arc::new(catalog_storage),
            catalog.compression,
            catalog.max_concurrent_reads,
            "catalog",
        );
        let events_source = StorageSource::new(
            Arc::new(events_storage),
            events.compression,
            events.max_concurrent_reads,
            "events",
        );

        Ok(Self::new(
            Arc::new(catalog_source),
            Arc::new(events_source),
            Arc::new(sink),
            PipelineOptions {
                play_action: config.play_action.clone(),
                compression: config.sink.compression,
                max_rows_per_file: config.sink.max_rows_per_file,
            },
        ))
    }

    /// Run the job once. Rerunning over the same inputs replaces the output.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();
        info!(
            catalog = %self.catalog.describe(),
            events = %self.events.describe(),
            run_id = %self.writer.run_id(),
            "Starting playlog run"
        );

        let (catalog, events) = tokio::try_join!(
            self.catalog_loader.load(self.catalog.as_ref()),
            self.event_loader.load(self.events.as_ref()),
        )?;

        let transform_start = Instant::now();
        let schema = StarSchema::build(&catalog.records, &events.records);
        let batches = [
            table_batch(&schema.dimensions.songs)?,
            table_batch(&schema.dimensions.artists)?,
            table_batch(&schema.dimensions.users)?,
            table_batch(&schema.dimensions.time)?,
            table_batch(&schema.songplays)?,
        ];
        emit!(StageCompleted {
            stage: "transform",
            duration: transform_start.elapsed(),
        });

        let write_start = Instant::now();
        let mut tables = self.write_all(batches).await?;
        tables.sort_by(|a, b| a.table.cmp(&b.table));
        emit!(StageCompleted {
            stage: "write",
            duration: write_start.elapsed(),
        });
        emit!(StageCompleted {
            stage: "run",
            duration: start.elapsed(),
        });

        info!(
            tables = tables.len(),
            rows = tables.iter().map(|t| t.rows).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Playlog run complete"
        );

        Ok(RunSummary {
            catalog: catalog.stats,
            events: events.stats,
            fact: schema.fact_stats,
            tables,
        })
    }

    async fn write_all<const N: usize>(
        &self,
        batches: [TableBatch; N],
    ) -> Result<Vec<TableWriteSummary>, PipelineError> {
        let mut writes = JoinSet::new();
        for table in batches {
            let writer = self.writer.clone();
            writes.spawn(async move {
                writer
                    .write(table.name, table.batch, table.partition_columns)
                    .await
            });
        }

        let mut tables = Vec::with_capacity(N);
        while let Some(joined) = writes.join_next().await {
            match joined.context(TaskJoinSnafu).and_then(|result| result) {
                Ok(summary) => tables.push(summary),
                Err(e) => {
                    error!(
                        table = e.failed_component().unwrap_or("unknown"),
                        error = %e,
                        "Table write failed, aborting remaining writes"
                    );
                    writes.abort_all();
                    return Err(e);
                }
            }
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::error::StorageError;
    use crate::source::InMemorySource;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    const CATALOG: &str = concat!(
        r#"{"song_id": "SOSOMEID", "title": "Test Song", "artist_id": "ARTID1", "#,
        r#""artist_name": "Test Artist", "year": 2000, "duration": 200.0, "num_songs": 1}"#
    );

    fn log_line(page: &str, user: &str, song: &str, ts: i64) -> String {
        format!(
            concat!(
                r#"{{"page": "{}", "userId": "{}", "firstName": "Lily", "lastName": "Koch", "#,
                r#""gender": "F", "level": "free", "sessionId": "5", "song": "{}", "#,
                r#""artist": "Test Artist", "length": 200.0, "ts": {}}}"#
            ),
            page, user, song, ts
        )
    }

    fn mixed_log() -> Vec<String> {
        vec![
            log_line("Home", "10", "", 1541121934000),
            log_line("NextSong", "10", "Test Song", 1541121934796),
            log_line("Logout", "10", "", 1541121935000),
            log_line("NextSong", "11", "Unknown Song", 1541121999000),
        ]
    }

    #[derive(Default)]
    struct MemorySink {
        files: Mutex<BTreeMap<String, Bytes>>,
        fail_table: Option<&'static str>,
    }

    #[async_trait]
    impl TableSink for MemorySink {
        fn describe(&self) -> String {
            "memory://".to_string()
        }

        async fn clear_table(&self, table: &str) -> Result<usize, StorageError> {
            let prefix = format!("{table}/");
            let mut files = self.files.lock().unwrap();
            let before = files.len();
            files.retain(|path, _| !path.starts_with(&prefix));
            Ok(before - files.len())
        }

        async fn put_file(&self, path: &str, bytes: Bytes) -> Result<(), StorageError> {
            if self.fail_table.is_some_and(|t| path.starts_with(t)) {
                return Err(StorageError::InvalidUrl {
                    url: path.to_string(),
                });
            }
            self.files.lock().unwrap().insert(path.to_string(), bytes);
            Ok(())
        }
    }

    fn pipeline(sink: Arc<MemorySink>, events: Vec<String>) -> Pipeline {
        let catalog = InMemorySource::new("songs").with_lines("A/A/A/song.json", [CATALOG]);
        let events = InMemorySource::new("logs").with_lines("2018/11/events.json", events);
        Pipeline::new(
            Arc::new(catalog),
            Arc::new(events),
            sink,
            PipelineOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_run_writes_every_table() {
        let sink = Arc::new(MemorySink::default());
        let summary = pipeline(sink.clone(), mixed_log()).run().await.unwrap();

        let names: Vec<_> = summary.tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(names, vec!["artists", "songplays", "songs", "time", "users"]);
        assert_eq!(summary.events.filtered, 2);
        assert_eq!(summary.fact.rows, 2);
        assert_eq!(summary.fact.matched, 1);
        assert_eq!(summary.table("songplays").unwrap().rows, 2);
        assert_eq!(summary.table("users").unwrap().rows, 2);

        let paths: Vec<String> = sink.files.lock().unwrap().keys().cloned().collect();
        let has_dir = |dir: &str| paths.iter().any(|p| p.starts_with(dir));
        assert!(has_dir("songs/year=2000/artist=Test Artist/"));
        assert!(has_dir("songplays/year=2018/month=11/"));
        assert!(has_dir("time/year=2018/month=11/"));
    }

    #[tokio::test]
    async fn test_filtering_commutes() {
        let works = CatalogLoader::new()
            .load(&InMemorySource::new("songs").with_lines("song.json", [CATALOG]))
            .await
            .unwrap()
            .records;

        let mixed = InMemorySource::new("mixed").with_lines("log.json", mixed_log());
        let plays_only: Vec<String> = mixed_log()
            .into_iter()
            .filter(|line| line.contains(r#""page": "NextSong""#))
            .collect();
        let prefiltered = InMemorySource::new("plays").with_lines("log.json", plays_only);

        let loader = EventLoader::default();
        let from_mixed = loader.load(&mixed).await.unwrap().records;
        let from_plays = loader.load(&prefiltered).await.unwrap().records;

        let a = StarSchema::build(&works, &from_mixed);
        let b = StarSchema::build(&works, &from_plays);
        assert_eq!(a.dimensions.users, b.dimensions.users);
        assert_eq!(a.dimensions.time, b.dimensions.time);
        assert_eq!(a.songplays, b.songplays);
    }

    /// Decoded contents keyed by directory and file sequence, without the run id.
    fn snapshot(sink: &MemorySink) -> BTreeMap<String, RecordBatch> {
        sink.files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, bytes)| {
                let (dir, name) = path.rsplit_once('/').unwrap();
                let sequence: Vec<&str> = name.splitn(3, '-').take(2).collect();
                let sequence = sequence.join("-");
                let reader = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())
                    .unwrap()
                    .build()
                    .unwrap();
                let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
                let schema = batches[0].schema();
                let batch = arrow::compute::concat_batches(&schema, &batches).unwrap();
                (format!("{dir}/{sequence}"), batch)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_rerun_replaces_output() {
        let sink = Arc::new(MemorySink::default());
        let first_run = pipeline(sink.clone(), mixed_log());
        first_run.run().await.unwrap();
        let first = snapshot(&sink);

        let second_run = pipeline(sink.clone(), mixed_log());
        second_run.run().await.unwrap();
        let second = snapshot(&sink);

        let keys: Vec<_> = first.keys().collect();
        assert_eq!(keys, second.keys().collect::<Vec<_>>());
        assert_eq!(first, second);
        assert!(keys.iter().any(|k| k.starts_with("songplays/year=2018/month=11/part-")));
        assert!(sink.files.lock().unwrap().keys().all(|path| {
            path.contains(&second_run.writer.run_id().to_string())
        }));
    }

    #[test]
    fn test_debug_names_sources() {
        let pipeline = pipeline(Arc::new(MemorySink::default()), mixed_log());
        let text = format!("{pipeline:?}");
        assert!(text.contains("memory://songs"));
        assert!(text.contains("memory://logs"));
        assert!(text.contains("NextSong"));
    }

    #[tokio::test]
    async fn test_failed_table_write_fails_the_run() {
        let sink = Arc::new(MemorySink {
            fail_table: Some("users/"),
            ..Default::default()
        });

        let err = pipeline(sink, mixed_log()).run().await.unwrap_err();
        assert_eq!(err.failed_component(), Some("users"));
    }

    #[tokio::test]
    async fn test_unavailable_source_fails_before_writing() {
        struct Missing;

        #[async_trait]
        impl RecordSource for Missing {
            fn describe(&self) -> String {
                "missing://".to_string()
            }

            async fn documents(
                &self,
            ) -> Result<crate::source::DocumentStream, crate::error::ReaderError> {
                Err(crate::error::ReaderError::SourceRead {
                    source: StorageError::InvalidUrl {
                        url: "missing://".to_string(),
                    },
                })
            }
        }

        let sink = Arc::new(MemorySink::default());
        let catalog = InMemorySource::new("songs").with_lines("song.json", [CATALOG]);
        let pipeline = Pipeline::new(
            Arc::new(catalog),
            Arc::new(Missing),
            sink.clone(),
            PipelineOptions::default(),
        );

        let err = pipeline.run().await.unwrap_err();
        assert_eq!(err.failed_component(), Some("events"));
        assert!(sink.files.lock().unwrap().is_empty());
    }
}
