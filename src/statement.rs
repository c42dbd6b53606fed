use crate::results::{DbRow, ResultSet};
use crate::types::RowValues;

/// Cursor over the result of one executed statement.
///
/// Rows are materialized when the statement runs; the cursor walks them in order. Once closed
/// (explicitly, or because its owner ran another statement in its place) it yields nothing more,
/// while `row_count` keeps reporting what the statement did.
#[derive(Debug)]
pub struct Statement {
    sql: String,
    result: ResultSet,
    position: usize,
    open: bool,
}

impl Statement {
    pub(crate) fn new(sql: impl Into<String>, result: ResultSet) -> Self {
        Self {
            sql: sql.into(),
            result,
            position: 0,
            open: true,
        }
    }

    /// SQL text that produced this cursor, after placeholder rewriting.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Next row, or `None` once exhausted or closed.
    pub fn fetch(&mut self) -> Option<DbRow> {
        if !self.open {
            return None;
        }
        let row = self.result.results.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        row
    }

    /// All rows not read yet.
    pub fn fetch_all(&mut self) -> Vec<DbRow> {
        if !self.open {
            return Vec::new();
        }
        let rest = self.result.results[self.position..].to_vec();
        self.position = self.result.results.len();
        rest
    }

    /// Column `column_index` of the next row. The row is consumed even when the column does
    /// not exist.
    pub fn fetch_column(&mut self, column_index: usize) -> Option<RowValues> {
        self.fetch()
            .and_then(|row| row.get_by_index(column_index).cloned())
    }

    /// Affected rows for DML, returned rows for queries.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.result.rows_affected
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.result.column_names().len()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.result.column_names()
    }

    /// Rows left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        if self.open {
            self.result.results.len() - self.position
        } else {
            0
        }
    }

    /// Discard unread rows; the cursor yields nothing afterwards.
    pub fn close_cursor(&mut self) {
        self.open = false;
        self.result.results.clear();
        self.position = 0;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(rows: i64) -> Statement {
        let mut rs = ResultSet::with_columns(vec!["n".into(), "sq".into()], 4);
        for n in 1..=rows {
            rs.add_row_values(vec![RowValues::Int(n), RowValues::Int(n * n)]);
        }
        Statement::new("select n, sq from t", rs)
    }

    #[test]
    fn fetch_walks_rows_then_stops() {
        let mut stmt = statement(2);
        assert_eq!(stmt.fetch().unwrap().get("n"), Some(&RowValues::Int(1)));
        assert_eq!(stmt.remaining(), 1);
        assert_eq!(stmt.fetch().unwrap().get("n"), Some(&RowValues::Int(2)));
        assert!(stmt.fetch().is_none());
        assert!(stmt.fetch().is_none());
    }

    #[test]
    fn fetch_all_returns_only_unread_rows() {
        let mut stmt = statement(3);
        let _ = stmt.fetch();
        let rest = stmt.fetch_all();
        assert_eq!(rest.len(), 2);
        assert!(stmt.fetch_all().is_empty());
    }

    #[test]
    fn fetch_column_reads_next_row() {
        let mut stmt = statement(2);
        assert_eq!(stmt.fetch_column(1), Some(RowValues::Int(1)));
        assert_eq!(stmt.fetch_column(1), Some(RowValues::Int(4)));
        assert_eq!(stmt.fetch_column(0), None);
    }

    #[test]
    fn closed_cursor_keeps_count_but_yields_nothing() {
        let mut stmt = statement(3);
        stmt.close_cursor();
        assert!(!stmt.is_open());
        assert!(stmt.fetch().is_none());
        assert!(stmt.fetch_all().is_empty());
        assert_eq!(stmt.row_count(), 3);
        assert_eq!(stmt.remaining(), 0);
        assert_eq!(stmt.column_count(), 2);
    }
}
