use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, index_columns};
use crate::types::RowValues;

/// Rows materialized from one statement, plus its row count.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    /// Rows affected by a DML statement, or rows returned by a query
    pub rows_affected: usize,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Empty result set for a statement that returns `column_names`.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> ResultSet {
        let column_index = Arc::new(index_columns(&column_names));
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Result of a statement that returns no rows.
    #[must_use]
    pub fn affected(rows_affected: usize) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row; values must be in column order.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.results.push(DbRow::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            row_values,
        ));
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_columns_and_count() {
        let mut rs = ResultSet::with_columns(vec!["a".into()], 2);
        rs.add_row_values(vec![RowValues::Int(1)]);
        rs.add_row_values(vec![RowValues::Int(2)]);
        assert_eq!(rs.rows_affected, 2);
        assert_eq!(rs.len(), 2);
        assert!(Arc::ptr_eq(
            &rs.results[0].column_names,
            &rs.results[1].column_names
        ));
        assert_eq!(rs.results[1].get("a"), Some(&RowValues::Int(2)));
    }

    #[test]
    fn dml_result_has_no_rows() {
        let rs = ResultSet::affected(3);
        assert!(rs.is_empty());
        assert_eq!(rs.rows_affected, 3);
        assert!(rs.column_names().is_empty());
    }
}
