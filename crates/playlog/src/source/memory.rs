//! In-memory record source.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};

use super::{DocumentStream, RecordSource, SourceDocument};
use crate::error::ReaderError;

/// A source backed by documents held in memory.
///
/// Useful for embedding the pipeline and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    name: String,
    documents: Vec<SourceDocument>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Vec::new(),
        }
    }

    /// Add a document made of the given lines.
    pub fn with_lines<I, S>(mut self, path: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.documents.push(SourceDocument {
            path: path.into(),
            bytes: Bytes::from(text),
        });
        self
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    fn describe(&self) -> String {
        format!("memory://{}", self.name)
    }

    async fn documents(&self) -> Result<DocumentStream, ReaderError> {
        Ok(stream::iter(self.documents.clone()).map(Ok).boxed())
    }
}
