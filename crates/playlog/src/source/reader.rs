//! NDJSON document reader.
//!
//! Splits a document into lines and validates every line against a declared
//! schema. Malformed lines are logged, counted and skipped; they never fail
//! the document.

use tracing::debug;

use playlog_core::emit;
use playlog_core::metrics::events::RecordRejected;

use super::SourceDocument;
use crate::error::RecordError;
use crate::schema::{SourceSchema, ValidatedRecord};

/// Per-document decoding statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Non-blank lines seen.
    pub lines: usize,
    /// Lines that passed validation.
    pub valid: usize,
    /// Lines dropped as malformed.
    pub rejected: usize,
    /// Optional fields reset to null across all valid lines.
    pub nulled_fields: usize,
}

/// Reads documents of one source kind.
pub struct NdjsonReader {
    schema: &'static SourceSchema,
}

impl NdjsonReader {
    pub fn new(schema: &'static SourceSchema) -> Self {
        Self { schema }
    }

    /// Decode every line of `document`, handing valid records to `on_record`.
    pub fn read_document(
        &self,
        document: &SourceDocument,
        on_record: &mut dyn FnMut(ValidatedRecord),
    ) -> DocumentStats {
        let mut stats = DocumentStats::default();

        for (index, raw) in document.bytes.split(|b| *b == b'\n').enumerate() {
            let line_no = index + 1;
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            stats.lines += 1;

            match self.decode(line_no, raw) {
                Ok(record) => {
                    stats.valid += 1;
                    stats.nulled_fields += record.nulled_fields();
                    on_record(record);
                }
                Err(e) => {
                    stats.rejected += 1;
                    emit!(RecordRejected {
                        source: self.schema.kind().as_str(),
                        reason: e.reason(),
                    });
                    debug!(
                        source = %self.schema.kind(),
                        path = %document.path,
                        error = %e,
                        "Dropping malformed record"
                    );
                }
            }
        }

        stats
    }

    fn decode(&self, line_no: usize, raw: &[u8]) -> Result<ValidatedRecord, RecordError> {
        let text = std::str::from_utf8(raw).map_err(|e| RecordError::InvalidJson {
            line: line_no,
            message: e.to_string(),
        })?;
        self.schema.decode_line(line_no, text)
    }
}
