use std::sync::{Arc, LazyLock};

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::error::ArrowError;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use indexmap::IndexSet;

use crate::model::EventRecord;
use crate::table::StarTable;

static SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("user_id", DataType::Utf8, true),
        Field::new("first_name", DataType::Utf8, true),
        Field::new("last_name", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
    ]))
});

/// One row of the `users` dimension.
///
/// A user whose subscription level changed appears once per level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserRow {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// Distinct user rows over play events, in first-encounter order.
pub fn build_users(events: &[EventRecord]) -> Vec<UserRow> {
    events
        .iter()
        .map(|e| UserRow {
            user_id: e.user_id.clone(),
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            gender: e.gender.clone(),
            level: e.subscription_level.clone(),
        })
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

impl StarTable for UserRow {
    const NAME: &'static str = "users";
    const PARTITION_COLUMNS: &'static [&'static str] = &[];

    fn schema() -> SchemaRef {
        SCHEMA.clone()
    }

    fn to_record_batch(rows: &[Self]) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.user_id.as_deref()))),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.first_name.as_deref()),
            )),
            Arc::new(StringArray::from_iter(
                rows.iter().map(|r| r.last_name.as_deref()),
            )),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.gender.as_deref()))),
            Arc::new(StringArray::from_iter(rows.iter().map(|r| r.level.as_deref()))),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::tests::event;

    #[test]
    fn test_level_change_yields_two_rows() {
        let mut paid = event("10", "Halo", "Beyoncé", 121.5, 1000);
        paid.subscription_level = Some("paid".to_string());
        let events = vec![
            event("10", "Halo", "Beyoncé", 121.5, 1000),
            event("10", "Yellow", "Coldplay", 266.0, 2000),
            paid,
        ];

        let users = build_users(&events);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].level.as_deref(), Some("free"));
        assert_eq!(users[1].level.as_deref(), Some("paid"));
    }

    #[test]
    fn test_record_batch_has_user_columns() {
        let users = build_users(&[event("10", "Halo", "Beyoncé", 121.5, 1000)]);
        let batch = UserRow::to_record_batch(&users).unwrap();
        assert_eq!(batch.num_columns(), 5);
        assert_eq!(batch.schema().field(4).name(), "level");
    }
}
