//! Error types for the playlog pipeline.
//!
//! Record-level failures ([`RecordError`]) are absorbed by the loaders: the
//! offending line is dropped and counted. Everything else is stage-level and
//! surfaces to the caller as a [`PipelineError`] naming the failing stage or
//! table.

use snafu::prelude::*;

pub use playlog_core::error::{ConfigError, StorageError};

/// Why a single input line was rejected during schema enforcement.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub))]
pub enum RecordError {
    /// Line is not valid JSON.
    #[snafu(display("line {line}: invalid JSON: {message}"))]
    InvalidJson { line: usize, message: String },

    /// Line is JSON but not an object.
    #[snafu(display("line {line}: expected a JSON object"))]
    NotAnObject { line: usize },

    /// Essential field is absent or null.
    #[snafu(display("line {line}: missing required field '{field}'"))]
    MissingField { line: usize, field: &'static str },

    /// Essential field holds a value that cannot be coerced to its declared type.
    #[snafu(display("line {line}: field '{field}' cannot be read as {expected}"))]
    IncompatibleType {
        line: usize,
        field: &'static str,
        expected: &'static str,
    },
}

impl RecordError {
    /// Short, stable label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RecordError::InvalidJson { .. } => "invalid_json",
            RecordError::NotAnObject { .. } => "not_an_object",
            RecordError::MissingField { .. } => "missing_field",
            RecordError::IncompatibleType { .. } => "incompatible_type",
        }
    }
}

/// Errors that can occur while reading input documents.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// The source could not be listed or a document could not be fetched.
    #[snafu(display("Failed to read from source: {source}"))]
    SourceRead { source: StorageError },

    /// A document could not be decompressed.
    #[snafu(display("Failed to decompress {path}: {source}"))]
    Decompression {
        path: String,
        source: std::io::Error,
    },
}

/// Errors that can occur during Parquet encoding.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParquetError {
    /// Failed to assemble an Arrow batch.
    #[snafu(display("Failed to build record batch: {source}"))]
    BatchBuild { source: arrow::error::ArrowError },

    /// Failed to create the Parquet writer.
    #[snafu(display("Failed to create Parquet writer: {source}"))]
    WriterCreate {
        source: parquet::errors::ParquetError,
    },

    /// Failed to write to Parquet.
    #[snafu(display("Failed to write to Parquet: {source}"))]
    ParquetWrite {
        source: parquet::errors::ParquetError,
    },

    /// A declared partition column does not exist in the batch.
    #[snafu(display("Unknown partition column '{column}'"))]
    UnknownPartitionColumn { column: String },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage could not be set up for a source or sink location.
    #[snafu(display("Storage error for {url}: {source}"))]
    Storage {
        url: String,
        source: StorageError,
    },

    /// An input source could not be opened or read.
    #[snafu(display("Source for stage '{stage}' is unavailable: {source}"))]
    SourceUnavailable {
        stage: &'static str,
        source: ReaderError,
    },

    /// A table could not be encoded.
    #[snafu(display("Failed to encode table '{table}': {source}"))]
    Encode { table: String, source: ParquetError },

    /// The sink rejected a write for a table.
    #[snafu(display("Failed to write table '{table}': {source}"))]
    SinkWrite {
        table: String,
        source: StorageError,
    },

    /// A spawned task panicked or was cancelled.
    #[snafu(display("Task join error: {source}"))]
    TaskJoin { source: tokio::task::JoinError },
}

impl PipelineError {
    /// Name of the stage or table the error belongs to, if any.
    pub fn failed_component(&self) -> Option<&str> {
        match self {
            PipelineError::SourceUnavailable { stage, .. } => Some(*stage),
            PipelineError::Encode { table, .. } | PipelineError::SinkWrite { table, .. } => {
                Some(table.as_str())
            }
            _ => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}
