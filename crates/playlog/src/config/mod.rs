//! Configuration for the playlog batch job.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;
use crate::loader::DEFAULT_PLAY_ACTION;
use crate::source::CompressionFormat;
use playlog_core::error::{
    EmptyPlayActionSnafu, EmptySinkPathSnafu, EmptySourcePathSnafu, InvalidRowsPerFileSnafu,
    ReadFileSnafu, YamlParseSnafu,
};
pub use playlog_core::config::{ParquetCompression, interpolate};

/// One raw input location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the NDJSON documents (S3, GCS or local).
    pub path: String,
    /// Compression of the input documents.
    #[serde(default)]
    pub compression: CompressionFormat,
    /// Maximum concurrent document downloads.
    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
    /// Storage options (credentials, region, etc.).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

fn default_max_concurrent_reads() -> usize {
    16
}

/// The two raw inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Song catalog.
    pub catalog: SourceConfig,
    /// Listening log.
    pub events: SourceConfig,
}

/// Output location of the star schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Output root; each table is written to a directory below it.
    pub path: String,
    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,
    /// Rows per Parquet file before rolling to the next one.
    #[serde(default = "default_max_rows_per_file")]
    pub max_rows_per_file: usize,
    /// Storage options (credentials, region, etc.).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

fn default_max_rows_per_file() -> usize {
    1_000_000
}

fn default_play_action() -> String {
    DEFAULT_PLAY_ACTION.to_string()
}

/// Main configuration for playlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub sources: SourcesConfig,
    pub sink: SinkConfig,
    /// `page` value that marks a song play.
    #[serde(default = "default_play_action")]
    pub play_action: String,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        let config: Config = serde_yaml::from_str(&result.text).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, source) in [
            ("catalog", &self.sources.catalog),
            ("events", &self.sources.events),
        ] {
            ensure!(!source.path.trim().is_empty(), EmptySourcePathSnafu { name });
        }
        ensure!(!self.sink.path.trim().is_empty(), EmptySinkPathSnafu);
        ensure!(self.sink.max_rows_per_file > 0, InvalidRowsPerFileSnafu);
        ensure!(!self.play_action.is_empty(), EmptyPlayActionSnafu);
        Ok(())
    }
}
