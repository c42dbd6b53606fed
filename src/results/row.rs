use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::types::RowValues;

/// A row from a query result: column names mapped to scalar values.
///
/// Column names and the name→index lookup are shared by every row of one result set.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    pub values: Vec<RowValues>,
    column_index: Arc<HashMap<String, usize>>,
}

impl PartialEq for DbRow {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

impl DbRow {
    /// Create a standalone row, building its own column lookup.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Value of the first column, if the row has any columns.
    #[must_use]
    pub fn first_value(&self) -> Option<&RowValues> {
        self.values.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The row as a JSON object keyed by column name. When a name repeats, the last column wins.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let object: Map<String, JsonValue> = self
            .column_names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        JsonValue::Object(object)
    }
}

/// Name→index lookup. For duplicate names (`SELECT a.id, b.id`) the first column wins, as
/// drivers resolve by-name access.
pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> DbRow {
        DbRow::new(
            Arc::new(vec!["id".into(), "name".into(), "id".into()]),
            vec![
                RowValues::Int(1),
                RowValues::Text("ann".into()),
                RowValues::Int(2),
            ],
        )
    }

    #[test]
    fn lookup_by_name_and_index() {
        let row = row();
        assert_eq!(row.get("name").and_then(RowValues::as_text), Some("ann"));
        assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(row.get_by_index(2), Some(&RowValues::Int(2)));
        assert!(row.get("missing").is_none());
        assert_eq!(row.first_value(), Some(&RowValues::Int(1)));
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn json_object() {
        let json = DbRow::new(
            Arc::new(vec!["id".into(), "name".into()]),
            vec![RowValues::Int(1), RowValues::Null],
        )
        .to_json();
        assert_eq!(json, serde_json::json!({"id": 1, "name": null}));
    }
}
