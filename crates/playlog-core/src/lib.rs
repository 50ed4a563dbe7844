//! playlog-core: shared plumbing for the playlog batch transform.
//!
//! - `storage/` - object-store abstraction over S3, GCS and the local filesystem
//! - `metrics/` - internal events recorded through the `metrics` facade
//! - `config/` - environment variable interpolation, CLI arguments, shared enums
//! - `error` - storage and configuration error types
//! - `tracing` - subscriber initialization for the CLI

pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod tracing;

pub use config::{CliArgs, InterpolationResult, ParquetCompression, interpolate};
pub use error::{ConfigError, StorageError};
pub use storage::{BackendConfig, StorageProvider, StorageProviderRef};
pub use tracing::init_tracing;
