use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::SimpleDbError;
use crate::translation::PlaceholderStyle;

/// Values that can be stored in a database row or bound as query parameters.
///
/// The same enum is used by every backend, so caller code never touches driver types:
/// ```rust
/// use simple_db::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans come back from `SQLite` as 0/1 integers, so those are accepted too.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(dt);
                }
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Convert into a JSON value. Blobs become arrays of bytes, timestamps ISO-8601 text.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::from(s.as_str()),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Timestamp(dt) => JsonValue::from(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(value) => value.clone(),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

/// The database engine behind a connection.
///
/// Parsed from the engine identifiers callers already use in DSNs:
/// ```rust
/// use simple_db::prelude::*;
///
/// let engine: DatabaseType = "sqlite".parse().unwrap();
/// assert_eq!(engine, DatabaseType::Sqlite);
/// assert!("mysql".parse::<DatabaseType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Deserialize)]
#[serde(try_from = "String")]
pub enum DatabaseType {
    /// `SQLite` database (rusqlite)
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// `PostgreSQL` database (tokio-postgres)
    #[cfg(feature = "postgres")]
    #[value(alias = "pgsql", alias = "postgresql")]
    Postgres,
}

impl DatabaseType {
    /// Placeholder flavor the engine's driver understands.
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => PlaceholderStyle::Sqlite,
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => PlaceholderStyle::Postgres,
        }
    }
}

impl Default for DatabaseType {
    #[cfg(feature = "sqlite")]
    fn default() -> Self {
        DatabaseType::Sqlite
    }

    #[cfg(not(feature = "sqlite"))]
    fn default() -> Self {
        DatabaseType::Postgres
    }
}

const UNSUPPORTED_ENGINES: &[&str] = &["mysql", "mariadb", "odbc", "sqlsrv", "mssql", "ibm", "oci"];

impl FromStr for DatabaseType {
    type Err = SimpleDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let engine = s.trim().to_ascii_lowercase();
        match engine.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" | "sqlite3" => Ok(DatabaseType::Sqlite),
            #[cfg(feature = "postgres")]
            "pgsql" | "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            #[allow(unreachable_patterns)]
            "sqlite" | "sqlite3" | "pgsql" | "postgres" | "postgresql" => Err(
                SimpleDbError::Unimplemented(format!(
                    "engine `{engine}` is not enabled in the current build"
                )),
            ),
            other if UNSUPPORTED_ENGINES.contains(&other) => Err(SimpleDbError::Unimplemented(
                format!("engine `{other}` is not supported"),
            )),
            other => Err(SimpleDbError::ConfigError(format!(
                "unknown database engine `{other}`"
            ))),
        }
    }
}

impl TryFrom<String> for DatabaseType {
    type Error = SimpleDbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A SQL statement together with its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }

    /// Append one value for a placeholder the caller added (e.g. in a WHERE clause).
    #[must_use]
    pub fn push_param(mut self, value: impl Into<RowValues>) -> Self {
        self.params.push(value.into());
        self
    }

    #[must_use]
    pub fn extend_params(mut self, values: impl IntoIterator<Item = RowValues>) -> Self {
        self.params.extend(values);
        self
    }
}

impl From<&str> for QueryAndParams {
    fn from(query: &str) -> Self {
        QueryAndParams::new_without_params(query)
    }
}

impl From<String> for QueryAndParams {
    fn from(query: String) -> Self {
        QueryAndParams::new_without_params(query)
    }
}

impl From<&QueryAndParams> for QueryAndParams {
    fn from(query: &QueryAndParams) -> Self {
        query.clone()
    }
}

/// Values bound to a prepared query: either by position or by `:name`.
///
/// ```rust
/// use simple_db::prelude::*;
///
/// let positional: Params = vec![RowValues::Int(7)].into();
/// let named: Params = vec![(":id", RowValues::Int(7))].into();
/// assert!(matches!(positional, Params::Positional(_)));
/// assert!(matches!(named, Params::Named(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Positional(Vec<RowValues>),
    Named(Vec<(String, RowValues)>),
}

impl Params {
    #[must_use]
    pub fn none() -> Self {
        Params::Positional(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Positional(values) => values.is_empty(),
            Params::Named(values) => values.is_empty(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::none()
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Params::none()
    }
}

impl From<Vec<RowValues>> for Params {
    fn from(values: Vec<RowValues>) -> Self {
        Params::Positional(values)
    }
}

impl From<&[RowValues]> for Params {
    fn from(values: &[RowValues]) -> Self {
        Params::Positional(values.to_vec())
    }
}

impl<const N: usize> From<[RowValues; N]> for Params {
    fn from(values: [RowValues; N]) -> Self {
        Params::Positional(values.to_vec())
    }
}

impl From<Vec<(&str, RowValues)>> for Params {
    fn from(values: Vec<(&str, RowValues)>) -> Self {
        Params::Named(
            values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}

impl From<Vec<(String, RowValues)>> for Params {
    fn from(values: Vec<(String, RowValues)>) -> Self {
        Params::Named(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_identifiers() {
        #[cfg(feature = "sqlite")]
        assert_eq!("SQLite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        #[cfg(feature = "postgres")]
        {
            assert_eq!("pgsql".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
            assert_eq!("postgresql".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
        }
        assert!(matches!(
            "mysql".parse::<DatabaseType>(),
            Err(SimpleDbError::Unimplemented(_))
        ));
        assert!(matches!(
            "oracle-ish".parse::<DatabaseType>(),
            Err(SimpleDbError::ConfigError(_))
        ));
    }

    #[test]
    fn bool_accepts_sqlite_integers() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
        assert_eq!(RowValues::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn timestamp_from_text() {
        let ts = RowValues::Text("2024-01-03 10:30:00".into()).as_timestamp().unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "10:30");
        let frac = RowValues::Text("2024-01-03 10:30:00.250".into()).as_timestamp();
        assert!(frac.is_some());
        assert!(RowValues::Text("yesterday".into()).as_timestamp().is_none());
    }

    #[test]
    fn json_conversion() {
        assert_eq!(RowValues::Null.to_json(), JsonValue::Null);
        assert_eq!(RowValues::Text("a".into()).to_json(), JsonValue::from("a"));
        assert_eq!(RowValues::Int(3).to_json(), JsonValue::from(3));
    }

    #[test]
    fn query_and_params_accumulates_values() {
        let q = QueryAndParams::from("UPDATE t SET a = ?1 WHERE id = ?2")
            .push_param("x")
            .push_param(4_i64);
        assert_eq!(q.params, vec![RowValues::Text("x".into()), RowValues::Int(4)]);
    }
}
