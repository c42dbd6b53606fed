use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::error::SimpleDbError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SimpleDbError` if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SimpleDbError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a prepared statement and materialize what it produced.
///
/// Statements with result columns are read to the end; everything else reports the number of
/// rows changed.
///
/// # Errors
/// Returns `SimpleDbError::SqliteError` if binding, execution or row extraction fails.
pub fn build_result_set(stmt: &mut Statement, params: &[Value]) -> Result<ResultSet, SimpleDbError> {
    if stmt.column_count() == 0 {
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(ResultSet::affected(affected));
    }

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_columns(column_names, 16);

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
