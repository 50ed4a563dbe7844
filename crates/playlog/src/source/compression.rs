//! Decompression of input documents.

use std::io::Read;

use serde::{Deserialize, Serialize};

/// Compression format of input documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionFormat {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl CompressionFormat {
    /// File name suffixes accepted for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CompressionFormat::None => &[".json", ".ndjson", ".jsonl"],
            CompressionFormat::Gzip => &[".json.gz", ".ndjson.gz", ".jsonl.gz"],
            CompressionFormat::Zstd => &[".json.zst", ".ndjson.zst", ".jsonl.zst"],
        }
    }

    /// Whether `path` names a document of this format.
    pub fn matches(&self, path: &str) -> bool {
        self.extensions().iter().any(|ext| path.ends_with(ext))
    }

    /// Decompress a whole document.
    pub fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        match self {
            CompressionFormat::None => Ok(data.to_vec()),
            CompressionFormat::Gzip => {
                let mut out = Vec::with_capacity(data.len() * 4);
                flate2::read::MultiGzDecoder::new(data).read_to_end(&mut out)?;
                Ok(out)
            }
            CompressionFormat::Zstd => zstd::stream::decode_all(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const NDJSON: &[u8] = b"{\"song_id\":\"S1\"}\n{\"song_id\":\"S2\"}\n";

    #[test]
    fn test_extension_matching() {
        assert!(CompressionFormat::None.matches("song_data/A/A/A/TRAAAAW128F429D538.json"));
        assert!(!CompressionFormat::None.matches("log_data/2018-11-01-events.json.gz"));
        assert!(CompressionFormat::Gzip.matches("log_data/2018-11-01-events.json.gz"));
        assert!(CompressionFormat::Zstd.matches("x.ndjson.zst"));
        assert!(!CompressionFormat::None.matches("_SUCCESS"));
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(NDJSON).unwrap();
        let compressed = encoder.finish().unwrap();

        let decompressed = CompressionFormat::Gzip.decompress(&compressed).unwrap();
        assert_eq!(decompressed, NDJSON);
    }

    #[test]
    fn test_zstd_roundtrip() {
        let compressed = zstd::stream::encode_all(NDJSON, 0).unwrap();
        let decompressed = CompressionFormat::Zstd.decompress(&compressed).unwrap();
        assert_eq!(decompressed, NDJSON);
    }

    #[test]
    fn test_corrupt_gzip_is_error() {
        assert!(CompressionFormat::Gzip.decompress(b"not gzip").is_err());
    }
}
