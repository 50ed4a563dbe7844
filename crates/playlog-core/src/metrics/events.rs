//! Internal events for playlog metrics emission.
//!
//! ## Labels
//!
//! Loader events carry a `source` label (`"catalog"` or `"events"`), sink
//! events a `table` label (`"songs"`, `"artists"`, ...).

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when raw bytes are read from an input document.
pub struct BytesRead {
    pub bytes: u64,
    pub source: &'static str,
}

impl InternalEvent for BytesRead {
    fn emit(self) {
        trace!(bytes = self.bytes, source = self.source, "Bytes read");
        counter!("playlog_bytes_read_total", "source" => self.source).increment(self.bytes);
    }
}

/// Event emitted when records pass schema validation.
pub struct RecordsLoaded {
    pub count: u64,
    pub source: &'static str,
}

impl InternalEvent for RecordsLoaded {
    fn emit(self) {
        trace!(count = self.count, source = self.source, "Records loaded");
        counter!("playlog_records_loaded_total", "source" => self.source).increment(self.count);
    }
}

/// Event emitted when a record is dropped because it failed schema coercion.
pub struct RecordRejected {
    pub source: &'static str,
    pub reason: &'static str,
}

impl InternalEvent for RecordRejected {
    fn emit(self) {
        trace!(source = self.source, reason = self.reason, "Record rejected");
        counter!(
            "playlog_records_rejected_total",
            "source" => self.source,
            "reason" => self.reason
        )
        .increment(1);
    }
}

/// Event emitted when valid records are discarded by a loader filter.
pub struct RecordsFiltered {
    pub count: u64,
    pub source: &'static str,
}

impl InternalEvent for RecordsFiltered {
    fn emit(self) {
        trace!(count = self.count, source = self.source, "Records filtered");
        counter!("playlog_records_filtered_total", "source" => self.source).increment(self.count);
    }
}

/// Outcome of matching one event against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    Matched,
    Unmatched,
    Ambiguous,
}

impl JoinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinStatus::Matched => "matched",
            JoinStatus::Unmatched => "unmatched",
            JoinStatus::Ambiguous => "ambiguous",
        }
    }
}

/// Event emitted once per join outcome bucket after the fact table is built.
pub struct JoinCompleted {
    pub status: JoinStatus,
    pub count: u64,
}

impl InternalEvent for JoinCompleted {
    fn emit(self) {
        trace!(status = self.status.as_str(), count = self.count, "Join completed");
        counter!("playlog_join_rows_total", "status" => self.status.as_str())
            .increment(self.count);
    }
}

/// Event emitted when rows of a table are written to the sink.
pub struct RowsWritten {
    pub count: u64,
    pub table: String,
}

impl InternalEvent for RowsWritten {
    fn emit(self) {
        trace!(count = self.count, table = %self.table, "Rows written");
        counter!("playlog_rows_written_total", "table" => self.table).increment(self.count);
    }
}

/// Event emitted when a Parquet file is persisted.
pub struct FileWritten {
    pub bytes: u64,
    pub table: String,
}

impl InternalEvent for FileWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, table = %self.table, "File written");
        counter!("playlog_files_written_total", "table" => self.table.clone()).increment(1);
        counter!("playlog_bytes_written_total", "table" => self.table).increment(self.bytes);
    }
}

/// Event emitted when a Parquet file has been encoded in memory.
pub struct ParquetEncodeCompleted {
    pub duration: Duration,
    pub table: String,
}

impl InternalEvent for ParquetEncodeCompleted {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis(), table = %self.table, "Parquet encoded");
        histogram!("playlog_parquet_encode_duration_seconds", "table" => self.table)
            .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a pipeline stage finishes.
pub struct StageCompleted {
    pub stage: &'static str,
    pub duration: Duration,
}

impl InternalEvent for StageCompleted {
    fn emit(self) {
        trace!(stage = self.stage, duration_ms = self.duration.as_millis(), "Stage completed");
        histogram!("playlog_stage_duration_seconds", "stage" => self.stage)
            .record(self.duration.as_secs_f64());
    }
}

/// Storage operation type.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    Delete,
    List,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::Delete => "delete",
            StorageOperation::List => "list",
        }
    }
}

/// Request status for storage operations.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }
}

impl<T, E> From<&Result<T, E>> for RequestStatus {
    fn from(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }
}

/// Event emitted for each storage request.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "playlog_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted with the latency of a storage request.
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        histogram!(
            "playlog_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
