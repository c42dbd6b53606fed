use std::fmt;
use std::thread;
use std::time::Duration;

use crate::config::ConnectOptions;
use crate::connection::OpenFailure;
use crate::error::{FailureSite, SimpleDbError};
use crate::escape::quote_identifier;
use crate::results::ResultSet;
use crate::types::{QueryAndParams, RowValues};

use super::params::Params;
use super::query::build_result_set;

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

/// One rusqlite connection, used from the calling thread only.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    path: String,
}

impl SqliteConnection {
    /// Open the database file and make sure it really is a database.
    ///
    /// A file that cannot be opened fails at [`FailureSite::Connect`]; a file that opens but
    /// is not readable as a database fails at [`FailureSite::SelectDatabase`].
    pub(crate) fn open(options: &ConnectOptions) -> Result<Self, OpenFailure> {
        let path = options.database.clone();
        if !options.user.is_empty() || !options.password.is_empty() {
            tracing::debug!(path = %path, "sqlite ignores user and password");
        }

        let conn = rusqlite::Connection::open(&path)
            .map_err(|e| OpenFailure::new(FailureSite::Connect, e.into()))?;

        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| OpenFailure::new(FailureSite::SelectDatabase, e.into()))?;

        conn.execute_batch("PRAGMA encoding = 'UTF-8';")
            .map_err(|e| OpenFailure::new(FailureSite::SelectDatabase, e.into()))?;

        tracing::debug!(path = %path, "sqlite connection opened");
        Ok(Self { conn, path })
    }

    /// Prepare, bind and run one statement.
    ///
    /// # Errors
    /// Returns `SimpleDbError::SqliteError` if preparing or executing the statement fails.
    pub fn run(&mut self, query: &str, params: &[RowValues]) -> Result<ResultSet, SimpleDbError> {
        let mut stmt = self.conn.prepare(query)?;
        let converted = Params::convert(params)?;
        build_result_set(&mut stmt, converted.as_values())
    }

    /// Execute one or more statements without parameters.
    ///
    /// # Errors
    /// Returns `SimpleDbError::SqliteError` if any statement fails.
    pub fn execute_batch(&mut self, query: &str) -> Result<(), SimpleDbError> {
        self.conn.execute_batch(query)?;
        Ok(())
    }

    /// Rowid of the last successful INSERT on this connection. `SQLite` has no sequences, so
    /// `_id_column` is accepted for signature parity and ignored.
    #[must_use]
    pub fn last_insert_id(&self, _id_column: Option<&str>) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Query reporting the value the next AUTOINCREMENT / rowid insert into `table` will get.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ParameterError` for an invalid table name, or the driver error
    /// if the schema lookup fails.
    pub fn next_id_query(&mut self, table: &str) -> Result<QueryAndParams, SimpleDbError> {
        let quoted = quote_identifier(table)?;
        let has_sequence_table = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
            [],
            |row| row.get::<_, i64>(0),
        )? > 0;

        let bare_name = table.rsplit('.').next().unwrap_or(table);
        Ok(if has_sequence_table {
            QueryAndParams::new(
                format!(
                    "SELECT COALESCE((SELECT seq FROM sqlite_sequence WHERE name = ?1), \
                     (SELECT MAX(rowid) FROM {quoted}), 0) + 1 AS \"Auto_increment\""
                ),
                vec![RowValues::Text(bare_name.to_string())],
            )
        } else {
            QueryAndParams::new_without_params(format!(
                "SELECT COALESCE((SELECT MAX(rowid) FROM {quoted}), 0) + 1 AS \"Auto_increment\""
            ))
        })
    }

    /// Begin a transaction.
    ///
    /// # Errors
    /// Returns `SimpleDbError` if a transaction is already active or BEGIN fails.
    pub fn begin(&mut self) -> Result<(), SimpleDbError> {
        if self.in_transaction() {
            return Err(SimpleDbError::ExecutionError(
                "SQLite transaction already in progress".into(),
            ));
        }
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Commit an open transaction.
    ///
    /// # Errors
    /// Returns `SimpleDbError` if no transaction is active or COMMIT fails.
    pub fn commit(&mut self) -> Result<(), SimpleDbError> {
        self.ensure_in_tx()?;
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Roll back an open transaction, retrying briefly while the database reports busy.
    ///
    /// # Errors
    /// Returns `SimpleDbError` if no transaction is active or ROLLBACK keeps failing.
    pub fn rollback(&mut self) -> Result<(), SimpleDbError> {
        self.ensure_in_tx()?;
        for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
            match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => return Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::DatabaseBusy
                        && idx + 1 < ROLLBACK_BUSY_RETRIES.len() =>
                {
                    tracing::debug!(attempt = idx + 1, "sqlite rollback busy, retrying");
                    thread::sleep(delay);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(SimpleDbError::ExecutionError(
            "rollback retries exhausted".into(),
        ))
    }

    /// Whether a transaction is open, however it was started.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn ensure_in_tx(&self) -> Result<(), SimpleDbError> {
        if self.in_transaction() {
            Ok(())
        } else {
            Err(SimpleDbError::ExecutionError(
                "SQLite transaction not active".into(),
            ))
        }
    }

    /// Close the connection, reporting errors instead of swallowing them in `Drop`.
    ///
    /// # Errors
    /// Returns `SimpleDbError::SqliteError` if `SQLite` refuses to close.
    pub fn close(self) -> Result<(), SimpleDbError> {
        self.conn.close().map_err(|(_, err)| SimpleDbError::SqliteError(err))
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
