use rusqlite::types::Value;

use crate::error::SimpleDbError;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// `SQLite` has no boolean, timestamp or JSON storage class: booleans become 0/1, timestamps
/// `YYYY-MM-DD HH:MM:SS[.fff]` text, JSON its serialized text.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Owned `SQLite` parameter list.
pub struct Params(pub Vec<Value>);

impl Params {
    /// Convert row values into `SQLite` values.
    ///
    /// # Errors
    ///
    /// Conversion to `SQLite` values is total; the `Result` matches the Postgres `Params::convert`.
    pub fn convert(params: &[RowValues]) -> Result<Self, SimpleDbError> {
        Ok(Params(params.iter().map(row_value_to_sqlite_value).collect()))
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn converts_non_native_types() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let params = Params::convert(&[
            RowValues::Bool(true),
            RowValues::Timestamp(ts),
            RowValues::JSON(serde_json::json!({"a": 1})),
            RowValues::Null,
        ])
        .unwrap();
        assert_eq!(
            params.as_values(),
            &[
                Value::Integer(1),
                Value::Text("2024-01-02 03:04:05".into()),
                Value::Text(r#"{"a":1}"#.into()),
                Value::Null,
            ]
        );
    }
}
