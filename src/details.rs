use serde::Serialize;
use serde_json::Value;

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowValue {
    pub key: String,
    /// JSON text of the field, so strings keep their quotes.
    pub value: String,
}

/// One row per top-level field, in field order. Non-object records yield a
/// single row keyed by `row_name`.
pub fn row_values<T: Serialize + ?Sized>(record: &T, row_name: &str) -> Result<Vec<RowValue>> {
    let rows = match serde_json::to_value(record)? {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| RowValue {
                key,
                value: value.to_string(),
            })
            .collect(),
        other => vec![RowValue {
            key: row_name.to_string(),
            value: other.to_string(),
        }],
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;

    #[test]
    fn test_task_rows_in_field_order() {
        let task = &data::seed_tasks()[0];
        let rows = row_values(task, "rowData").unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(
            keys,
            ["taskId", "user", "name", "description", "status", "added", "updated", "isActive"]
        );
        assert_eq!(rows[0].value, "1");
        assert_eq!(rows[2].value, "\"Groceries\"");
        assert_eq!(rows[7].value, "true");
    }

    #[test]
    fn test_scalar_record_uses_row_name() {
        let rows = row_values(&42, "rowData").unwrap();
        assert_eq!(
            rows,
            vec![RowValue {
                key: "rowData".into(),
                value: "42".into()
            }]
        );
    }
}
