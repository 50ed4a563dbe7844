//! Declared schemas for the raw inputs.
//!
//! Each raw source has a fixed field list. Incoming lines are decoded with
//! `serde_json` and every declared field is coerced to its semantic type.
//! Fields that are not declared are ignored.

mod coerce;

pub use coerce::{FieldValue, coerce_value};

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde_json::Value;

use crate::error::RecordError;

/// Identifies a raw input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Song catalog (`song_data`).
    Catalog,
    /// Listening event log (`log_data`).
    Events,
}

impl SourceKind {
    /// Stable label used in logs, metrics and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Catalog => "catalog",
            SourceKind::Events => "events",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of a raw field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Integer values: epoch timestamps, counts, ids.
    Long,
    /// Real values: durations, coordinates.
    Double,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Long => "long",
            FieldKind::Double => "double",
        }
    }

    /// Convert to Arrow DataType.
    pub fn to_arrow_type(self) -> DataType {
        match self {
            FieldKind::Text => DataType::Utf8,
            FieldKind::Long => DataType::Int64,
            FieldKind::Double => DataType::Float64,
        }
    }
}

/// One declared field of a raw source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name on the wire.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Records whose essential fields are missing or malformed are dropped.
    /// Other fields fall back to null.
    pub essential: bool,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        essential: false,
    }
}

const fn essential(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        essential: true,
    }
}

static CATALOG_FIELDS: [FieldSpec; 10] = [
    field("artist_id", FieldKind::Text),
    field("artist_latitude", FieldKind::Double),
    field("artist_longitude", FieldKind::Double),
    field("artist_location", FieldKind::Text),
    field("artist_name", FieldKind::Text),
    field("duration", FieldKind::Double),
    field("num_songs", FieldKind::Long),
    essential("song_id", FieldKind::Text),
    field("title", FieldKind::Text),
    field("year", FieldKind::Long),
];

static EVENT_FIELDS: [FieldSpec; 18] = [
    field("artist", FieldKind::Text),
    field("auth", FieldKind::Text),
    field("firstName", FieldKind::Text),
    field("gender", FieldKind::Text),
    field("itemInSession", FieldKind::Long),
    field("lastName", FieldKind::Text),
    field("length", FieldKind::Double),
    field("level", FieldKind::Text),
    field("location", FieldKind::Text),
    field("method", FieldKind::Text),
    essential("page", FieldKind::Text),
    field("registration", FieldKind::Double),
    field("sessionId", FieldKind::Long),
    field("song", FieldKind::Text),
    field("status", FieldKind::Long),
    essential("ts", FieldKind::Long),
    field("userAgent", FieldKind::Text),
    field("userId", FieldKind::Text),
];

static CATALOG_SCHEMA: SourceSchema = SourceSchema {
    kind: SourceKind::Catalog,
    fields: &CATALOG_FIELDS,
};

static EVENT_SCHEMA: SourceSchema = SourceSchema {
    kind: SourceKind::Events,
    fields: &EVENT_FIELDS,
};

/// Registry of the declared raw schemas.
pub struct SchemaCatalog;

impl SchemaCatalog {
    /// Declared schema for a source.
    pub fn schema(kind: SourceKind) -> &'static SourceSchema {
        match kind {
            SourceKind::Catalog => &CATALOG_SCHEMA,
            SourceKind::Events => &EVENT_SCHEMA,
        }
    }
}

/// Field list declared for one source.
#[derive(Debug)]
pub struct SourceSchema {
    kind: SourceKind,
    fields: &'static [FieldSpec],
}

impl SourceSchema {
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Look up a declared field by wire name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Arrow view of the declared fields. Every field is nullable.
    pub fn to_arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(f.name, f.kind.to_arrow_type(), true))
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Decode and validate one NDJSON line.
    ///
    /// `line` is the 1-based line number, used for diagnostics.
    pub fn decode_line(&self, line: usize, text: &str) -> Result<ValidatedRecord, RecordError> {
        let value: Value = serde_json::from_str(text).map_err(|e| RecordError::InvalidJson {
            line,
            message: e.to_string(),
        })?;
        let Value::Object(obj) = value else {
            return Err(RecordError::NotAnObject { line });
        };

        let mut values = Vec::with_capacity(self.fields.len());
        let mut nulled = 0;

        for spec in self.fields {
            let raw = obj.get(spec.name).unwrap_or(&Value::Null);
            let coerced = match coerce_value(raw, spec.kind) {
                Some(v) => v,
                None if spec.essential => {
                    return Err(RecordError::IncompatibleType {
                        line,
                        field: spec.name,
                        expected: spec.kind.as_str(),
                    });
                }
                None => {
                    nulled += 1;
                    FieldValue::Null
                }
            };

            if spec.essential && coerced.is_null() {
                return Err(RecordError::MissingField {
                    line,
                    field: spec.name,
                });
            }
            values.push(coerced);
        }

        Ok(ValidatedRecord {
            fields: self.fields,
            values,
            nulled,
        })
    }
}

/// A record whose declared fields have all been coerced.
#[derive(Debug, Clone)]
pub struct ValidatedRecord {
    fields: &'static [FieldSpec],
    values: Vec<FieldValue>,
    nulled: usize,
}

impl ValidatedRecord {
    fn get(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.values[i])
            .unwrap_or(&FieldValue::Null)
    }

    /// Number of non-essential fields that were reset to null during coercion.
    pub fn nulled_fields(&self) -> usize {
        self.nulled
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name) {
            FieldValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn long(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}
