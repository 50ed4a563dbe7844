//! Record source backed by object storage.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use snafu::prelude::*;
use tracing::{debug, info};

use playlog_core::emit;
use playlog_core::metrics::events::BytesRead;
use playlog_core::storage::StorageProviderRef;

use super::{CompressionFormat, DocumentStream, RecordSource, SourceDocument};
use crate::error::{DecompressionSnafu, ReaderError, SourceReadSnafu};

/// Reads every NDJSON document below a storage root.
///
/// Documents are listed up front and fetched lazily, at most
/// `max_concurrent_reads` ahead of the consumer, in path order.
pub struct StorageSource {
    storage: StorageProviderRef,
    compression: CompressionFormat,
    max_concurrent_reads: usize,
    label: &'static str,
}

impl StorageSource {
    pub fn new(
        storage: StorageProviderRef,
        compression: CompressionFormat,
        max_concurrent_reads: usize,
        label: &'static str,
    ) -> Self {
        Self {
            storage,
            compression,
            max_concurrent_reads: max_concurrent_reads.max(1),
            label,
        }
    }
}

async fn fetch(
    storage: StorageProviderRef,
    compression: CompressionFormat,
    label: &'static str,
    path: object_store::path::Path,
) -> Result<SourceDocument, ReaderError> {
    let raw = storage.get(&path).await.context(SourceReadSnafu)?;
    emit!(BytesRead {
        bytes: raw.len() as u64,
        source: label,
    });

    let path = path.to_string();
    let bytes = compression
        .decompress(&raw)
        .context(DecompressionSnafu { path: path.clone() })?;
    debug!(path = %path, compressed = raw.len(), bytes = bytes.len(), "Fetched document");

    Ok(SourceDocument {
        path,
        bytes: bytes.into(),
    })
}

#[async_trait]
impl RecordSource for StorageSource {
    fn describe(&self) -> String {
        self.storage.canonical_url().to_string()
    }

    async fn documents(&self) -> Result<DocumentStream, ReaderError> {
        let paths: Vec<_> = self
            .storage
            .list_recursive(None)
            .await
            .context(SourceReadSnafu)?
            .into_iter()
            .filter(|p| self.compression.matches(p.as_ref()))
            .collect();

        info!(
            source = self.label,
            location = %self.describe(),
            files = paths.len(),
            "Discovered input documents"
        );

        let storage = self.storage.clone();
        let compression = self.compression;
        let label = self.label;
        // `buffered` keeps completion order equal to the listing order.
        Ok(stream::iter(paths)
            .map(move |path| fetch(storage.clone(), compression, label, path))
            .buffered(self.max_concurrent_reads)
            .boxed())
    }
}
