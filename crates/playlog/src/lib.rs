//! playlog: builds a songplays star schema from raw song and log data.
//!
//! This crate handles:
//! - Reading NDJSON song catalog and listening log documents (S3, GCS, local)
//! - Enforcing the declared raw schemas and dropping malformed records
//! - Deriving the songs, artists, users and time dimensions
//! - Joining play events against the catalog into the songplays fact table
//! - Writing every table as Hive-partitioned Parquet, replacing earlier output

pub mod config;
pub mod dimension;
pub mod error;
pub mod fact;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod source;
pub mod table;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineOptions, RunSummary, StarSchema};

pub use playlog_core::{CliArgs, ParquetCompression, StorageProvider, init_tracing};
