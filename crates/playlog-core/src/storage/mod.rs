//! Object storage abstraction.
//!
//! Provides one interface over S3, GCS and the local filesystem. Every path
//! handed to a [`StorageProvider`] is relative to the key prefix parsed from
//! the provider's URL.

mod gcs;
mod local;
mod s3;
mod url_parser;

pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use s3::S3Config;
pub use url_parser::BackendConfig;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{IoSnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over different cloud storage backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for a writable location.
    ///
    /// Local directories are created if they do not exist yet.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        Self::construct(url, options, true).await
    }

    /// Create a storage provider for a location that must already exist.
    ///
    /// A missing local directory is reported as an IO error instead of being
    /// created, so an input typo surfaces before anything is read.
    pub async fn for_existing_url(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        Self::construct(url, options, false).await
    }

    async fn construct(
        url: &str,
        options: HashMap<String, String>,
        create: bool,
    ) -> Result<Self, StorageError> {
        let config = BackendConfig::parse_url(url)?;
        debug!(url, backend = config.name(), "Constructing storage provider");

        match config {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Gcs(config) => Self::construct_gcs(config).await,
            BackendConfig::Local(config) => Self::construct_local(config, create).await,
        }
    }

    /// Canonical URL of the provider root.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// List every object below `prefix`, recursively.
    ///
    /// Returned paths are relative to the provider root and sorted, so
    /// callers see the same order on every invocation.
    pub async fn list_recursive(&self, prefix: Option<&str>) -> Result<Vec<Path>, StorageError> {
        let full_prefix: Option<Path> = match (self.config.key(), prefix) {
            (Some(key), Some(prefix)) => Some(key.parts().chain(Path::from(prefix).parts()).collect()),
            (Some(key), None) => Some(key.clone()),
            (None, Some(prefix)) => Some(Path::from(prefix)),
            (None, None) => None,
        };
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let start = Instant::now();
        let result: Result<Vec<_>, _> = self
            .object_store
            .list(full_prefix.as_ref())
            .try_collect()
            .await;
        self.record(StorageOperation::List, &result, start);

        let mut paths: Vec<Path> = result
            .context(ObjectStoreSnafu)?
            .into_iter()
            .map(|meta| meta.location.parts().skip(key_part_count).collect())
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        let start = Instant::now();
        let result = self.object_store.get(&self.qualify_path(path)).await;
        self.record(StorageOperation::Get, &result, start);

        result
            .context(ObjectStoreSnafu)?
            .bytes()
            .await
            .context(ObjectStoreSnafu)
    }

    /// Put a payload to a path.
    pub async fn put(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        self.put_with_opts(path, PutPayload::from(bytes), PutOptions::default())
            .await
    }

    /// Put a Parquet file to a path with the correct content type.
    ///
    /// Local filesystem doesn't support attributes, so they are skipped there.
    pub async fn put_parquet(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        if matches!(self.config, BackendConfig::Local(_)) {
            return self.put(path, bytes).await;
        }

        let opts = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                AttributeValue::from("application/vnd.apache.parquet"),
            )]),
            ..Default::default()
        };
        self.put_with_opts(path, PutPayload::from(bytes), opts).await
    }

    async fn put_with_opts(
        &self,
        path: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.put_opts(&path, payload, opts).await;
        self.record(StorageOperation::Put, &result, start);

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Delete a file at the given path.
    pub async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.delete(&path).await;
        self.record(StorageOperation::Delete, &result, start);

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Delete every object below `prefix`. Returns the number of objects removed.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let paths = self.list_recursive(Some(prefix)).await?;
        for path in &paths {
            match self.delete(path).await {
                Ok(()) => {}
                // Already gone, e.g. removed by a concurrent cleanup.
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        // The local backend leaves the emptied directory tree behind.
        if let BackendConfig::Local(local) = &self.config {
            let dir = std::path::Path::new(&local.path).join(prefix);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).context(IoSnafu),
            }
        }
        Ok(paths.len())
    }

    fn record<T, E>(&self, operation: StorageOperation, result: &Result<T, E>, start: Instant) {
        emit!(StorageRequest {
            operation,
            status: RequestStatus::from(result),
        });
        emit!(StorageRequestDuration {
            operation,
            duration: start.elapsed(),
        });
    }
}
