//! Local filesystem storage backend implementation.

use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{IoSnafu, ObjectStoreSnafu, StorageError};

use super::{BackendConfig, StorageProvider};

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Absolute directory used as the provider root.
    pub path: String,
}

impl StorageProvider {
    pub(super) async fn construct_local(
        config: LocalConfig,
        create: bool,
    ) -> Result<Self, StorageError> {
        if create {
            tokio::fs::create_dir_all(&config.path)
                .await
                .context(IoSnafu)?;
        } else {
            tokio::fs::metadata(&config.path).await.context(IoSnafu)?;
        }

        let object_store: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(&config.path).context(ObjectStoreSnafu)?);

        let canonical_url = format!("file://{}", config.path);

        Ok(Self {
            config: BackendConfig::Local(config),
            object_store,
            canonical_url,
        })
    }
}
