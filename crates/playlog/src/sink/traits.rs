//! Sink abstraction used by the partitioned writer.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use snafu::prelude::*;

use playlog_core::StorageProvider;
use playlog_core::error::InvalidPathSnafu;

use crate::error::StorageError;

/// A writable destination for table files.
///
/// Paths are relative to the sink root and use `/` as separator.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;

    /// Remove every file of `table`. Returns the number of files removed.
    async fn clear_table(&self, table: &str) -> Result<usize, StorageError>;

    /// Store one encoded file.
    async fn put_file(&self, path: &str, bytes: Bytes) -> Result<(), StorageError>;
}

#[async_trait]
impl TableSink for StorageProvider {
    fn describe(&self) -> String {
        self.canonical_url().to_string()
    }

    async fn clear_table(&self, table: &str) -> Result<usize, StorageError> {
        self.delete_prefix(table).await
    }

    async fn put_file(&self, path: &str, bytes: Bytes) -> Result<(), StorageError> {
        // Partition values are already escaped; `parse` keeps them verbatim.
        let location = Path::parse(path).context(InvalidPathSnafu { path })?;
        self.put_parquet(&location, bytes).await
    }
}
