use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Row, Statement};

use crate::error::SimpleDbError;
use crate::results::ResultSet;
use crate::types::RowValues;

use super::params::Params as PgParams;

/// Prepare and run one statement, materializing rows when it has result columns.
///
/// # Errors
/// Returns `SimpleDbError::PostgresError` if preparing, executing or decoding fails.
pub(crate) async fn run_statement(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SimpleDbError> {
    let stmt = client.prepare(query).await?;
    let converted = PgParams::convert(params)?;
    if stmt.columns().is_empty() {
        let affected = client.execute(&stmt, converted.as_refs()).await?;
        return Ok(ResultSet::affected(
            usize::try_from(affected).unwrap_or(usize::MAX),
        ));
    }
    let rows = client.query(&stmt, converted.as_refs()).await?;
    build_result_set(&stmt, &rows)
}

/// Build a result set from the rows a prepared statement returned.
///
/// # Errors
/// Returns `SimpleDbError` if a column value cannot be decoded.
pub fn build_result_set(stmt: &Statement, rows: &[Row]) -> Result<ResultSet, SimpleDbError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_columns(column_names, rows.len());

    for row in rows {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(postgres_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// Unknown types are read as text, which fails for binary-only types such as `numeric`;
/// cast those in SQL (`amount::text`).
///
/// # Errors
/// Returns `SimpleDbError` if the column cannot be decoded.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SimpleDbError> {
    let type_info = row.columns()[idx].type_().clone();

    let value = match type_info {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)?
            .map_or(RowValues::Null, RowValues::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(RowValues::Null, RowValues::Float),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map_or(RowValues::Null, RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map_or(RowValues::Null, RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map_or(RowValues::Null, |v| {
                RowValues::Timestamp(v.and_time(chrono::NaiveTime::default()))
            }),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .map_or(RowValues::Null, RowValues::JSON),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(RowValues::Null, RowValues::Blob),
        _ => row
            .try_get::<_, Option<String>>(idx)?
            .map_or(RowValues::Null, RowValues::Text),
    };
    Ok(value)
}
