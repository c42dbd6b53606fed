//! Slot-based client with sentinel returns.
//!
//! Every query stores its cursor in a caller-chosen slot so several result sets can be read
//! side by side. Failures never panic: they come back as `false`, `None` or `0`, with the
//! error kept for [`LegacyClient::last_error`].

use std::collections::HashMap;

use crate::config::ConnectOptions;
use crate::connection::Connection;
use crate::error::SimpleDbError;
use crate::escape;
use crate::fatal;
use crate::query_builder::{self, BuildAction};
use crate::results::DbRow;
use crate::statement::Statement;
use crate::types::{QueryAndParams, RowValues};

/// Slot used when the caller does not care about keeping results apart.
pub const DEFAULT_SLOT: usize = 0;

#[derive(Debug)]
pub struct LegacyClient {
    conn: Option<Connection>,
    slots: HashMap<usize, Statement>,
    debug: bool,
    last_error: Option<SimpleDbError>,
}

impl LegacyClient {
    /// Open the connection.
    ///
    /// # Errors
    /// Returns `SimpleDbError::Unavailable` whose message is the fixed
    /// `The website is temporarily unavailable (E#00N).`, without driver detail.
    pub fn connect(options: &ConnectOptions) -> Result<Self, SimpleDbError> {
        let conn = Connection::try_open(options).map_err(|failure| failure.into_unavailable(false))?;
        Ok(Self {
            conn: Some(conn),
            slots: HashMap::new(),
            debug: false,
            last_error: None,
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

    /// Log failing SQL and the driver error at error level.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Error behind the most recent failed call, cleared by the next successful query.
    #[must_use]
    pub fn last_error(&self) -> Option<&SimpleDbError> {
        self.last_error.as_ref()
    }

    /// Run `sql` and keep its cursor in `slot`, replacing whatever was there.
    pub fn query(&mut self, sql: impl Into<QueryAndParams>, slot: usize) -> bool {
        let query = sql.into();
        if let Some(mut previous) = self.slots.remove(&slot) {
            previous.close_cursor();
        }

        match self.run(&query) {
            Ok(statement) => {
                self.slots.insert(slot, statement);
                self.last_error = None;
                true
            }
            Err(err) => {
                self.fail(&query.query, err);
                false
            }
        }
    }

    /// [`query`](Self::query), then the generated id; 0 if the query failed.
    pub fn query_id(&mut self, sql: impl Into<QueryAndParams>, slot: usize) -> i64 {
        if self.query(sql, slot) {
            self.last_id()
        } else {
            0
        }
    }

    /// Next row of the cursor in `slot`.
    pub fn fetch(&mut self, slot: usize) -> Option<DbRow> {
        self.slots.get_mut(&slot).and_then(Statement::fetch)
    }

    /// Rows affected or returned by the statement in `slot`.
    #[must_use]
    pub fn rows(&self, slot: usize) -> Option<usize> {
        self.slots.get(&slot).map(Statement::row_count)
    }

    /// Run `sql` and drain every row. A query with no rows gives `Some(vec![])`.
    pub fn execute(&mut self, sql: impl Into<QueryAndParams>, slot: usize) -> Option<Vec<DbRow>> {
        if !self.query(sql, slot) {
            return None;
        }
        self.slots.get_mut(&slot).map(Statement::fetch_all)
    }

    /// Run `sql` and return its first row.
    pub fn sexecute(&mut self, sql: impl Into<QueryAndParams>, slot: usize) -> Option<DbRow> {
        if !self.query(sql, slot) {
            return None;
        }
        self.fetch(slot)
    }

    /// First column of the first row.
    pub fn get(&mut self, sql: impl Into<QueryAndParams>, slot: usize) -> Option<RowValues> {
        self.sexecute(sql, slot)
            .and_then(|row| row.first_value().cloned())
    }

    /// Parameterized INSERT / UPDATE / SELECT in this connection's placeholder style.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ParameterError` for invalid names or missing fields, and
    /// `SimpleDbError::ConnectionClosed` after [`end`](Self::end).
    pub fn build<K: AsRef<str>>(
        &self,
        fields: &[(K, RowValues)],
        table: &str,
        action: BuildAction,
        extra: &str,
    ) -> Result<QueryAndParams, SimpleDbError> {
        let conn = self.conn.as_ref().ok_or(SimpleDbError::ConnectionClosed)?;
        query_builder::build(fields, table, action, extra, conn.placeholder_style())
    }

    /// Value the next auto-increment insert into `table` will receive.
    pub fn next_id(&mut self, table: &str, slot: usize) -> Option<i64> {
        let query = match self.connection_mut().and_then(|conn| conn.next_id_query(table)) {
            Ok(query) => query,
            Err(err) => {
                self.fail(table, err);
                return None;
            }
        };
        self.get(query, slot).and_then(|value| value.as_int().copied())
    }

    /// Id generated by the last insert on this connection, or 0.
    pub fn last_id(&mut self) -> i64 {
        match self.connection_mut().and_then(|conn| conn.last_insert_id(None)) {
            Ok(id) => id,
            Err(err) => {
                self.fail("last_id", err);
                0
            }
        }
    }

    /// Escape a scalar for a hand-written SQL literal; see [`escape::prepare`].
    #[must_use]
    pub fn prepare(&self, value: &str) -> String {
        escape::prepare(value)
    }

    /// Close the connection and drop every slot. Close errors are logged, not returned.
    pub fn end(&mut self) {
        self.slots.clear();
        if let Some(conn) = self.conn.take() {
            if let Err(err) = conn.close() {
                tracing::warn!(error = %err, "error while closing legacy connection");
            }
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, SimpleDbError> {
        self.conn.as_mut().ok_or(SimpleDbError::ConnectionClosed)
    }

    fn run(&mut self, query: &QueryAndParams) -> Result<Statement, SimpleDbError> {
        let conn = self.connection_mut()?;
        tracing::debug!(sql = %query.query, params = query.params.len(), "legacy query");
        let sql = conn.translate(&query.query).into_owned();
        let result = conn.run(query)?;
        Ok(Statement::new(sql, result))
    }

    fn fail(&mut self, sql: &str, err: SimpleDbError) {
        if self.debug {
            tracing::error!(sql = %sql, error = %err, "query failed");
        }
        self.last_error = Some(err);
    }
}

impl Drop for LegacyClient {
    fn drop(&mut self) {
        self.end();
    }
}
