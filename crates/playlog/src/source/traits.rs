//! Traits for raw record sources.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::ReaderError;

/// One decompressed input document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path or name of the document, used in diagnostics.
    pub path: String,
    /// Newline-delimited JSON content.
    pub bytes: Bytes,
}

/// Lazily produced documents of one source, in the source's stable order.
pub type DocumentStream = BoxStream<'static, Result<SourceDocument, ReaderError>>;

/// Provider of raw NDJSON documents for one logical input.
///
/// Implementations must return documents in the same order on every call so
/// that loading is reproducible.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Open the source. Documents are fetched as the stream is polled.
    async fn documents(&self) -> Result<DocumentStream, ReaderError>;
}
