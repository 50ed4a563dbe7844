//! Configuration building blocks shared by the playlog binary and library.

mod path;
mod vars;

pub use path::CliArgs;
pub use vars::{InterpolationResult, interpolate};

use serde::{Deserialize, Serialize};

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        compression: ParquetCompression,
    }

    #[test]
    fn test_parquet_compression_parses_lowercase() {
        let parsed: Wrapper = serde_yaml::from_str("compression: zstd").unwrap();
        assert_eq!(parsed.compression, ParquetCompression::Zstd);
    }

    #[test]
    fn test_parquet_compression_default_is_snappy() {
        assert_eq!(ParquetCompression::default(), ParquetCompression::Snappy);
    }
}
