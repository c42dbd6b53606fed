//! Parameterized client holding one connection and the statement it ran last.
//!
//! Unlike [`LegacyClient`](crate::legacy::LegacyClient), every operation returns a `Result`;
//! query failures are ordinary errors and never end the process.

mod passthrough;

pub use passthrough::{CallOutput, ConnectionMethod, Method, StatementMethod};

use crate::config::ConnectOptions;
use crate::connection::Connection;
use crate::error::SimpleDbError;
use crate::escape;
use crate::fatal;
use crate::results::DbRow;
use crate::statement::Statement;
use crate::types::{DatabaseType, Params, QueryAndParams, RowValues};

#[derive(Debug)]
pub struct PreparedClient {
    conn: Option<Connection>,
    last_statement: Option<Statement>,
}

impl PreparedClient {
    /// Open the connection for `options.engine`.
    ///
    /// # Errors
    /// Returns `SimpleDbError::Unavailable` whose message carries the driver error:
    /// `The website is temporarily unavailable (E#00N :: <driver error>).`
    pub fn connect(options: &ConnectOptions) -> Result<Self, SimpleDbError> {
        Ok(Self {
            conn: Some(Connection::open(options)?),
            last_statement: None,
        })
    }

    /// [`connect`](Self::connect), printing the fixed message and exiting on failure.
    #[must_use]
    pub fn connect_or_exit(options: &ConnectOptions) -> Self {
        match Self::connect(options) {
            Ok(client) => client,
            Err(err) => fatal::exit_unavailable(&err),
        }
    }

    /// Close the previous cursor, bind `values` to `sql` and run it.
    ///
    /// `values` may be positional (`?N` / `$N` in the engine's style, or either style when
    /// placeholder translation is on) or named (`:name`).
    ///
    /// ```rust
    /// use simple_db::prelude::*;
    ///
    /// let mut db = PreparedClient::connect(&ConnectOptions::sqlite(":memory:")).unwrap();
    /// let stmt = db.query("SELECT :a + :b AS total", vec![("a", RowValues::Int(2)), ("b", RowValues::Int(3))]).unwrap();
    /// assert_eq!(stmt.fetch_column(0), Some(RowValues::Int(5)));
    /// ```
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConnectionClosed` after [`end`](Self::end), a
    /// `ParameterError` when named values and placeholders disagree, or the driver error.
    /// On error there is no last statement.
    pub fn query(
        &mut self,
        sql: &str,
        values: impl Into<Params>,
    ) -> Result<&mut Statement, SimpleDbError> {
        if let Some(mut previous) = self.last_statement.take() {
            previous.close_cursor();
        }
        let conn = self.connection_mut()?;
        let bound = conn.bind(sql, values.into())?;
        tracing::debug!(sql = %bound.query, params = bound.params.len(), "prepared query");
        let result = conn.run(&bound)?;
        Ok(self
            .last_statement
            .insert(Statement::new(bound.query, result)))
    }

    /// Run an insert and return the id it generated.
    ///
    /// # Errors
    /// Returns the query error, or the driver error if no id is available.
    pub fn query_id(
        &mut self,
        sql: &str,
        values: impl Into<Params>,
        id_column: Option<&str>,
    ) -> Result<i64, SimpleDbError> {
        self.query(sql, values)?;
        self.last_id(id_column)
    }

    /// Rows affected (or returned) by the last statement.
    #[must_use]
    pub fn rows(&self) -> Option<usize> {
        self.last_statement.as_ref().map(Statement::row_count)
    }

    /// All rows of `sql`; empty when it matched nothing.
    ///
    /// # Errors
    /// Returns the error from [`query`](Self::query).
    pub fn execute(
        &mut self,
        sql: &str,
        values: impl Into<Params>,
    ) -> Result<Vec<DbRow>, SimpleDbError> {
        Ok(self.query(sql, values)?.fetch_all())
    }

    /// First row of `sql`, `None` when it matched nothing.
    ///
    /// # Errors
    /// Returns the error from [`query`](Self::query).
    pub fn sexecute(
        &mut self,
        sql: &str,
        values: impl Into<Params>,
    ) -> Result<Option<DbRow>, SimpleDbError> {
        Ok(self.query(sql, values)?.fetch())
    }

    /// Column `column_index` of the first row.
    ///
    /// # Errors
    /// Returns the error from [`query`](Self::query).
    pub fn get(
        &mut self,
        sql: &str,
        values: impl Into<Params>,
        column_index: usize,
    ) -> Result<Option<RowValues>, SimpleDbError> {
        Ok(self.query(sql, values)?.fetch_column(column_index))
    }

    /// Id generated by the last insert; Postgres callers may name the sequence.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConnectionClosed` after [`end`](Self::end), or the driver
    /// error if no id is available.
    pub fn last_id(&mut self, id_column: Option<&str>) -> Result<i64, SimpleDbError> {
        self.connection_mut()?.last_insert_id(id_column)
    }

    /// Release the last statement and close the connection. Calling it twice is a no-op.
    ///
    /// # Errors
    /// Returns the driver error if the connection does not close cleanly.
    pub fn end(&mut self) -> Result<(), SimpleDbError> {
        self.last_statement = None;
        match self.conn.take() {
            Some(conn) => conn.close(),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Engine of the open connection.
    #[must_use]
    pub fn engine(&self) -> Option<DatabaseType> {
        self.conn.as_ref().map(Connection::engine)
    }

    /// # Errors
    /// Returns `SimpleDbError` if a transaction is already open or BEGIN fails.
    pub fn begin_transaction(&mut self) -> Result<(), SimpleDbError> {
        self.connection_mut()?.begin()
    }

    /// # Errors
    /// Returns `SimpleDbError` if no transaction is open or COMMIT fails.
    pub fn commit(&mut self) -> Result<(), SimpleDbError> {
        self.connection_mut()?.commit()
    }

    /// # Errors
    /// Returns `SimpleDbError` if no transaction is open or ROLLBACK fails.
    pub fn rollback(&mut self) -> Result<(), SimpleDbError> {
        self.connection_mut()?.rollback()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(Connection::in_transaction)
    }

    /// Run one statement without parameters and return the affected row count. The last
    /// statement is left untouched.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConnectionClosed` after [`end`](Self::end), or the driver error.
    pub fn exec(&mut self, sql: &str) -> Result<usize, SimpleDbError> {
        let result = self
            .connection_mut()?
            .run(&QueryAndParams::new_without_params(sql))?;
        Ok(result.rows_affected)
    }

    /// `value` as a quoted SQL string literal.
    #[must_use]
    pub fn quote(&self, value: &str) -> String {
        escape::quote_literal(value)
    }

    /// Cursor of the most recent successful [`query`](Self::query).
    pub fn last_statement(&mut self) -> Option<&mut Statement> {
        self.last_statement.as_mut()
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, SimpleDbError> {
        self.conn.as_mut().ok_or(SimpleDbError::ConnectionClosed)
    }
}
