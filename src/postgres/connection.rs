use std::fmt;

use tokio::runtime::{Builder, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};

use crate::config::ConnectOptions;
use crate::connection::OpenFailure;
use crate::error::{FailureSite, SimpleDbError};
use crate::escape::quote_identifier;
use crate::results::ResultSet;
use crate::types::{QueryAndParams, RowValues};

use super::query::run_statement;

/// A tokio-postgres client driven by its own current-thread runtime, so the rest of the crate
/// can stay blocking.
///
/// Must not be used from inside another tokio runtime; `block_on` panics there.
pub struct PostgresConnection {
    runtime: Runtime,
    client: Client,
    in_transaction: bool,
    label: String,
}

impl PostgresConnection {
    /// Connect and force the session to UTF-8.
    ///
    /// A server that rejects the database name (`3D000`) fails at
    /// [`FailureSite::SelectDatabase`]; every other connect error at [`FailureSite::Connect`].
    pub(crate) fn open(options: &ConnectOptions) -> Result<Self, OpenFailure> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                OpenFailure::new(
                    FailureSite::Connect,
                    SimpleDbError::ConnectionError(format!("failed to start postgres runtime: {e}")),
                )
            })?;

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&options.host)
            .port(options.port_or_default())
            .dbname(&options.database)
            .user(&options.user);
        if !options.password.is_empty() {
            pg_config.password(&options.password);
        }

        let (client, connection) = runtime
            .block_on(pg_config.connect(NoTls))
            .map_err(|e| {
                let site = if e.code() == Some(&SqlState::INVALID_CATALOG_NAME) {
                    FailureSite::SelectDatabase
                } else {
                    FailureSite::Connect
                };
                OpenFailure::new(site, e.into())
            })?;

        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection ended with error");
            }
        });

        runtime
            .block_on(client.batch_execute("SET client_encoding TO 'UTF8'"))
            .map_err(|e| OpenFailure::new(FailureSite::SelectDatabase, e.into()))?;

        let label = format!(
            "{}@{}:{}/{}",
            options.user,
            options.host,
            options.port_or_default(),
            options.database
        );
        tracing::debug!(target = %label, "postgres connection opened");
        Ok(Self {
            runtime,
            client,
            in_transaction: false,
            label,
        })
    }

    /// Prepare, bind and run one statement.
    ///
    /// # Errors
    /// Returns `SimpleDbError::PostgresError` if preparing or executing the statement fails.
    pub fn run(&mut self, query: &str, params: &[RowValues]) -> Result<ResultSet, SimpleDbError> {
        let result = self
            .runtime
            .block_on(run_statement(&self.client, query, params))?;
        self.track_transaction(query);
        Ok(result)
    }

    /// Execute one or more statements without parameters.
    ///
    /// # Errors
    /// Returns `SimpleDbError::PostgresError` if any statement fails.
    pub fn execute_batch(&mut self, query: &str) -> Result<(), SimpleDbError> {
        self.runtime.block_on(self.client.batch_execute(query))?;
        self.track_transaction(query);
        Ok(())
    }

    /// Value most recently produced by a sequence in this session: `lastval()`, or
    /// `currval(sequence)` when a sequence name is given.
    ///
    /// # Errors
    /// Returns `SimpleDbError::PostgresError` if no sequence value exists yet in this session.
    pub fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<i64, SimpleDbError> {
        let client = &self.client;
        let row = match sequence {
            None => self
                .runtime
                .block_on(client.query_one("SELECT lastval()", &[]))?,
            Some(name) => self.runtime.block_on(
                client.query_one("SELECT currval($1::text::regclass)", &[&name]),
            )?,
        };
        Ok(row.try_get::<_, i64>(0)?)
    }

    /// Query reporting the value the `id` sequence of `table` will hand out next. Returns no
    /// rows when the table has no serial `id` column.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ParameterError` for an invalid table name.
    pub fn next_id_query(&mut self, table: &str) -> Result<QueryAndParams, SimpleDbError> {
        quote_identifier(table)?;
        Ok(QueryAndParams::new(
            "SELECT CASE WHEN s.last_value IS NULL THEN s.start_value \
             ELSE s.last_value + s.increment_by END AS \"Auto_increment\" \
             FROM pg_sequences s \
             WHERE format('%I.%I', s.schemaname, s.sequencename) = pg_get_serial_sequence($1, $2)",
            vec![
                RowValues::Text(table.to_string()),
                RowValues::Text("id".to_string()),
            ],
        ))
    }

    /// Begin a transaction.
    ///
    /// # Errors
    /// Returns `SimpleDbError` if a transaction is already active or BEGIN fails.
    pub fn begin(&mut self) -> Result<(), SimpleDbError> {
        if self.in_transaction {
            return Err(SimpleDbError::ExecutionError(
                "Postgres transaction already in progress".into(),
            ));
        }
        self.execute_batch("BEGIN")
    }

    /// Commit an open transaction.
    ///
    /// # Errors
    /// Returns `SimpleDbError` if no transaction is active or COMMIT fails.
    pub fn commit(&mut self) -> Result<(), SimpleDbError> {
        self.ensure_in_tx()?;
        self.in_transaction = false;
        self.execute_batch("COMMIT")
    }

    /// Roll back an open transaction.
    ///
    /// # Errors
    /// Returns `SimpleDbError` if no transaction is active or ROLLBACK fails.
    pub fn rollback(&mut self) -> Result<(), SimpleDbError> {
        self.ensure_in_tx()?;
        self.in_transaction = false;
        self.execute_batch("ROLLBACK")
    }

    /// Whether a transaction is open, whether it was started with [`begin`](Self::begin) or
    /// with a `BEGIN` / `START TRANSACTION` statement passed through `run` or `execute_batch`.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn track_transaction(&mut self, sql: &str) {
        for statement in sql.split(';') {
            if let Some(open) = transaction_effect(statement) {
                self.in_transaction = open;
            }
        }
    }

    fn ensure_in_tx(&self) -> Result<(), SimpleDbError> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(SimpleDbError::ExecutionError(
                "Postgres transaction not active".into(),
            ))
        }
    }

    /// Close the session. Any open transaction is rolled back by the server.
    ///
    /// # Errors
    /// Never fails today; the signature matches the `SQLite` backend.
    pub fn close(self) -> Result<(), SimpleDbError> {
        let Self {
            runtime, client, ..
        } = self;
        drop(client);
        drop(runtime);
        Ok(())
    }
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("target", &self.label)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

/// `Some(true)` for a statement that opens a transaction, `Some(false)` for one that ends it.
/// `ROLLBACK TO` a savepoint leaves the transaction open.
fn transaction_effect(statement: &str) -> Option<bool> {
    let mut words = statement
        .split_whitespace()
        .map(str::to_ascii_uppercase);
    match words.next()?.as_str() {
        "BEGIN" => Some(true),
        "START" => (words.next().as_deref() == Some("TRANSACTION")).then_some(true),
        "COMMIT" | "END" | "ABORT" => Some(false),
        "ROLLBACK" => match words.next().as_deref() {
            Some("TO" | "PREPARED") => None,
            _ => Some(false),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::transaction_effect;

    #[test]
    fn transaction_statements_are_recognized() {
        assert_eq!(transaction_effect("BEGIN"), Some(true));
        assert_eq!(transaction_effect("  begin work"), Some(true));
        assert_eq!(transaction_effect("START TRANSACTION ISOLATION LEVEL SERIALIZABLE"), Some(true));
        assert_eq!(transaction_effect("commit"), Some(false));
        assert_eq!(transaction_effect("END"), Some(false));
        assert_eq!(transaction_effect("ABORT"), Some(false));
        assert_eq!(transaction_effect("ROLLBACK"), Some(false));
        assert_eq!(transaction_effect("rollback to savepoint a"), None);
        assert_eq!(transaction_effect("SELECT 1"), None);
        assert_eq!(transaction_effect("start_date"), None);
        assert_eq!(transaction_effect(""), None);
    }
}
