//! Hive-style partitioning of record batches.
//!
//! A batch is split into one group per distinct combination of partition
//! values. Each group's directory is `col1=v1/col2=v2`, and the partition
//! columns are dropped from its payload.

use arrow::array::{Array, RecordBatch, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use indexmap::IndexMap;
use snafu::prelude::*;

use crate::error::{BatchBuildSnafu, ParquetError, UnknownPartitionColumnSnafu};

/// Directory name used for null and empty partition values.
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Rows of one partition.
#[derive(Debug, Clone)]
pub struct PartitionGroup {
    /// Relative directory, empty for unpartitioned tables.
    pub path: String,
    /// Rows with the partition columns removed.
    pub batch: RecordBatch,
}

fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '\u{00}'..='\u{1F}'
            | '"'
            | '#'
            | '%'
            | '\''
            | '*'
            | '/'
            | ':'
            | '='
            | '?'
            | '\\'
            | '\u{7F}'
            | '{'
            | '['
            | ']'
            | '^'
    )
}

/// Escape a partition value the way Hive does.
pub fn escape_partition_value(value: &str) -> String {
    if value.is_empty() {
        return DEFAULT_PARTITION.to_string();
    }

    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Split `batch` by the values of `columns`, in first-encounter order.
pub fn split_by_partition(
    batch: &RecordBatch,
    columns: &[&str],
) -> Result<Vec<PartitionGroup>, ParquetError> {
    let schema = batch.schema();
    let partition_indices = columns
        .iter()
        .map(|&column| {
            schema
                .index_of(column)
                .ok()
                .context(UnknownPartitionColumnSnafu { column })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if partition_indices.is_empty() {
        return Ok(vec![PartitionGroup {
            path: String::new(),
            batch: batch.clone(),
        }]);
    }

    let payload_indices: Vec<usize> = (0..schema.fields().len())
        .filter(|i| !partition_indices.contains(i))
        .collect();
    let payload = batch.project(&payload_indices).context(BatchBuildSnafu)?;

    let options = FormatOptions::default();
    let formatters = partition_indices
        .iter()
        .map(|&i| ArrayFormatter::try_new(batch.column(i).as_ref(), &options))
        .collect::<Result<Vec<_>, _>>()
        .context(BatchBuildSnafu)?;

    let mut groups: IndexMap<String, Vec<u32>> = IndexMap::new();
    for row in 0..batch.num_rows() {
        let mut segments = Vec::with_capacity(partition_indices.len());
        let columns = columns.iter().zip(&partition_indices).zip(&formatters);
        for ((name, &index), formatter) in columns {
            let value = if batch.column(index).is_null(row) {
                DEFAULT_PARTITION.to_string()
            } else {
                escape_partition_value(&formatter.value(row).to_string())
            };
            segments.push(format!("{name}={value}"));
        }
        groups.entry(segments.join("/")).or_default().push(row as u32);
    }

    groups
        .into_iter()
        .map(|(path, rows)| {
            let batch =
                take_record_batch(&payload, &UInt32Array::from(rows)).context(BatchBuildSnafu)?;
            Ok(PartitionGroup { path, batch })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow_schema::{DataType, Field, Schema};

    fn plays() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("user_id", DataType::Utf8, true),
            Field::new("year", DataType::Int32, true),
            Field::new("month", DataType::Int32, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["a", "b", "c", "d"])),
                Arc::new(Int32Array::from(vec![Some(2018), Some(2018), Some(2019), None])),
                Arc::new(Int32Array::from(vec![11, 12, 11, 1])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_escape_partition_value() {
        assert_eq!(escape_partition_value("Beyoncé"), "Beyoncé");
        assert_eq!(escape_partition_value("AC/DC"), "AC%2FDC");
        assert_eq!(escape_partition_value("a=b:c"), "a%3Db%3Ac");
        assert_eq!(escape_partition_value("100%"), "100%25");
        assert_eq!(escape_partition_value("Guns N' Roses"), "Guns N%27 Roses");
        assert_eq!(escape_partition_value(""), DEFAULT_PARTITION);
    }

    #[test]
    fn test_control_characters_are_escaped() {
        assert_eq!(escape_partition_value("Bad\u{0}Artist"), "Bad%00Artist");
        assert_eq!(escape_partition_value("tab\there"), "tab%09here");
        assert_eq!(escape_partition_value("del\u{7F}"), "del%7F");

        let segment = format!("artist={}", escape_partition_value("Bad\u{0}Artist"));
        assert!(object_store::path::Path::parse(&segment).is_ok());
    }

    #[test]
    fn test_split_groups_rows_in_encounter_order() {
        let groups = split_by_partition(&plays(), &["year", "month"]).unwrap();

        let paths: Vec<_> = groups.iter().map(|g| g.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "year=2018/month=11",
                "year=2018/month=12",
                "year=2019/month=11",
                "year=__HIVE_DEFAULT_PARTITION__/month=1",
            ]
        );
        for group in &groups {
            assert_eq!(group.batch.num_columns(), 1);
            assert_eq!(group.batch.schema().field(0).name(), "user_id");
        }
    }

    #[test]
    fn test_rows_with_equal_values_share_a_group() {
        let groups = split_by_partition(&plays(), &["month"]).unwrap();

        assert_eq!(groups[0].path, "month=11");
        assert_eq!(groups[0].batch.num_rows(), 2);
        let users = groups[0]
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!((users.value(0), users.value(1)), ("a", "c"));
    }

    #[test]
    fn test_unpartitioned_keeps_all_columns() {
        let groups = split_by_partition(&plays(), &[]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].path, "");
        assert_eq!(groups[0].batch.num_columns(), 3);
    }

    #[test]
    fn test_unknown_partition_column() {
        let err = split_by_partition(&plays(), &["day"]).unwrap_err();
        assert!(matches!(err, ParquetError::UnknownPartitionColumn { .. }));
    }
}
