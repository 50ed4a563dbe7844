//! Overwriting, partitioned table writer.

use std::sync::Arc;
use std::time::Instant;

use arrow::array::RecordBatch;
use snafu::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use playlog_core::emit;
use playlog_core::metrics::events::{FileWritten, RowsWritten};

use super::partition::split_by_partition;
use super::{ParquetEncoder, TableSink};
use crate::error::{EncodeSnafu, PipelineError, SinkWriteSnafu, TaskJoinSnafu};

/// What a single table write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWriteSummary {
    pub table: String,
    pub rows: usize,
    pub files: usize,
    pub partitions: usize,
    pub bytes: u64,
    /// Files removed by the overwrite.
    pub replaced_files: usize,
}

/// Writes tables to a sink as Hive-partitioned Parquet files.
///
/// Every write replaces the table's previous contents, so rerunning a job over
/// the same input converges to the same output.
#[derive(Clone)]
pub struct PartitionedWriter {
    sink: Arc<dyn TableSink>,
    encoder: ParquetEncoder,
    max_rows_per_file: usize,
    run_id: Uuid,
}

impl std::fmt::Debug for PartitionedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedWriter")
            .field("sink", &self.sink.describe())
            .field("max_rows_per_file", &self.max_rows_per_file)
            .field("run_id", &self.run_id)
            .finish()
    }
}

impl PartitionedWriter {
    pub fn new(
        sink: Arc<dyn TableSink>,
        encoder: ParquetEncoder,
        max_rows_per_file: usize,
    ) -> Self {
        Self {
            sink,
            encoder,
            max_rows_per_file: max_rows_per_file.max(1),
            run_id: Uuid::now_v7(),
        }
    }

    /// Identifier embedded in every file name written by this writer.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Replace `table` with the rows of `batch`, partitioned by `partition_columns`.
    ///
    /// An empty batch clears the table and writes nothing.
    pub async fn write(
        &self,
        table: &str,
        batch: RecordBatch,
        partition_columns: &[&str],
    ) -> Result<TableWriteSummary, PipelineError> {
        let start = Instant::now();
        let replaced_files = self
            .sink
            .clear_table(table)
            .await
            .context(SinkWriteSnafu { table })?;
        debug!(table, replaced_files, "Cleared table");

        let mut summary = TableWriteSummary {
            table: table.to_string(),
            rows: batch.num_rows(),
            files: 0,
            partitions: 0,
            bytes: 0,
            replaced_files,
        };
        if batch.num_rows() == 0 {
            info!(table, "Table is empty, nothing to write");
            return Ok(summary);
        }

        let groups =
            split_by_partition(&batch, partition_columns).context(EncodeSnafu { table })?;
        summary.partitions = groups.len();

        for group in groups {
            let rows = group.batch.num_rows();
            for offset in (0..rows).step_by(self.max_rows_per_file) {
                let len = self.max_rows_per_file.min(rows - offset);
                let chunk = group.batch.slice(offset, len);

                let encoder = self.encoder.clone();
                let name = table.to_string();
                let bytes = tokio::task::spawn_blocking(move || encoder.encode(&name, &chunk))
                    .await
                    .context(TaskJoinSnafu)?
                    .context(EncodeSnafu { table })?;

                let path = self.file_path(table, &group.path, summary.files);
                let size = bytes.len() as u64;
                self.sink
                    .put_file(&path, bytes)
                    .await
                    .context(SinkWriteSnafu { table })?;

                emit!(FileWritten {
                    bytes: size,
                    table: table.to_string(),
                });
                debug!(table, path, rows = len, bytes = size, "Wrote file");
                summary.files += 1;
                summary.bytes += size;
            }
        }

        emit!(RowsWritten {
            count: summary.rows as u64,
            table: table.to_string(),
        });
        info!(
            table,
            rows = summary.rows,
            files = summary.files,
            partitions = summary.partitions,
            bytes = summary.bytes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Wrote table"
        );
        Ok(summary)
    }

    fn file_path(&self, table: &str, partition: &str, sequence: usize) -> String {
        let file = format!("part-{sequence:05}-{}.parquet", self.run_id);
        if partition.is_empty() {
            format!("{table}/{file}")
        } else {
            format!("{table}/{partition}/{file}")
        }
    }
}
