//! Parquet encoding of Arrow batches.

use std::time::Instant;

use arrow::array::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;

use playlog_core::ParquetCompression;
use playlog_core::emit;
use playlog_core::metrics::events::ParquetEncodeCompleted;

use crate::error::{ParquetError, ParquetWriteSnafu, WriterCreateSnafu};

/// Encodes one batch into one in-memory Parquet file.
#[derive(Debug, Clone)]
pub struct ParquetEncoder {
    properties: WriterProperties,
}

impl Default for ParquetEncoder {
    fn default() -> Self {
        Self::new(ParquetCompression::default())
    }
}

impl ParquetEncoder {
    pub fn new(compression: ParquetCompression) -> Self {
        Self {
            properties: Self::writer_properties(compression),
        }
    }

    fn writer_properties(compression: ParquetCompression) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(match compression {
                ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
                ParquetCompression::Snappy => Compression::SNAPPY,
                ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
                ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
                ParquetCompression::Lz4 => Compression::LZ4,
            })
            .build()
    }

    /// Encode `batch` as a complete Parquet file.
    pub fn encode(&self, table: &str, batch: &RecordBatch) -> Result<Bytes, ParquetError> {
        let start = Instant::now();
        let properties = Some(self.properties.clone());
        let mut writer =
            ArrowWriter::try_new(Vec::new(), batch.schema(), properties).context(WriterCreateSnafu)?;
        writer.write(batch).context(ParquetWriteSnafu)?;
        let buffer = writer.into_inner().context(ParquetWriteSnafu)?;

        emit!(ParquetEncodeCompleted {
            duration: start.elapsed(),
            table: table.to_string(),
        });
        Ok(Bytes::from(buffer))
    }
}
