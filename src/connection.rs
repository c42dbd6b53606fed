use std::borrow::Cow;
use std::fmt;

use crate::config::ConnectOptions;
use crate::error::{FailureSite, SimpleDbError};
use crate::results::ResultSet;
use crate::translation::{PlaceholderStyle, bind_named, translate_placeholders};
use crate::types::{DatabaseType, Params, QueryAndParams};

#[cfg(feature = "postgres")]
use crate::postgres::PostgresConnection;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteConnection;

/// Why opening a connection failed, before it is turned into the fixed user-facing message.
#[derive(Debug)]
pub(crate) struct OpenFailure {
    pub site: FailureSite,
    pub source: SimpleDbError,
}

impl OpenFailure {
    pub(crate) fn new(site: FailureSite, source: SimpleDbError) -> Self {
        Self { site, source }
    }

    /// The fatal error, optionally carrying the driver's message.
    pub(crate) fn into_unavailable(self, with_detail: bool) -> SimpleDbError {
        tracing::error!(site = %self.site, error = %self.source, "database connection failed");
        let detail = with_detail.then(|| self.source.to_string());
        SimpleDbError::unavailable(self.site, detail)
    }
}

/// One open database connection of whichever engine was configured.
pub enum Connection {
    #[cfg(feature = "sqlite")]
    Sqlite {
        conn: SqliteConnection,
        translate_placeholders: bool,
    },
    #[cfg(feature = "postgres")]
    Postgres {
        conn: PostgresConnection,
        translate_placeholders: bool,
    },
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => f.debug_tuple("Sqlite").field(conn).finish(),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => f.debug_tuple("Postgres").field(conn).finish(),
        }
    }
}

impl Connection {
    /// Open a connection, reporting failure as [`SimpleDbError::Unavailable`] with the driver's
    /// message attached.
    ///
    /// # Errors
    /// Returns `SimpleDbError::Unavailable` when the options are invalid, the server or file
    /// cannot be reached, or the database cannot be selected.
    pub fn open(options: &ConnectOptions) -> Result<Self, SimpleDbError> {
        Self::try_open(options).map_err(|failure| failure.into_unavailable(true))
    }

    pub(crate) fn try_open(options: &ConnectOptions) -> Result<Self, OpenFailure> {
        options
            .validate()
            .map_err(|e| OpenFailure::new(FailureSite::Connect, e))?;
        let translate_placeholders = options.translate_placeholders;
        match options.engine {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Ok(Self::Sqlite {
                conn: SqliteConnection::open(options)?,
                translate_placeholders,
            }),
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Ok(Self::Postgres {
                conn: PostgresConnection::open(options)?,
                translate_placeholders,
            }),
        }
    }

    #[must_use]
    pub fn engine(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { .. } => DatabaseType::Sqlite,
            #[cfg(feature = "postgres")]
            Self::Postgres { .. } => DatabaseType::Postgres,
        }
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.engine().placeholder_style()
    }

    fn translation_enabled(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite {
                translate_placeholders,
                ..
            } => *translate_placeholders,
            #[cfg(feature = "postgres")]
            Self::Postgres {
                translate_placeholders,
                ..
            } => *translate_placeholders,
        }
    }

    /// `sql` with positional placeholders rewritten to this engine's style, when the
    /// connection was opened with translation on.
    #[must_use]
    pub fn translate<'q>(&self, sql: &'q str) -> Cow<'q, str> {
        translate_placeholders(sql, self.placeholder_style(), self.translation_enabled())
    }

    /// Pair `sql` with its values, resolving `:name` placeholders into this engine's
    /// positional style.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ParameterError` if named values and placeholders disagree.
    pub fn bind(&self, sql: &str, params: Params) -> Result<QueryAndParams, SimpleDbError> {
        match params {
            Params::Positional(values) => {
                Ok(QueryAndParams::new(self.translate(sql).into_owned(), values))
            }
            Params::Named(named) => bind_named(sql, &named, self.placeholder_style()),
        }
    }

    /// Run one statement and materialize what it returned.
    ///
    /// # Errors
    /// Returns the driver error if the statement fails.
    pub fn run(&mut self, query: &QueryAndParams) -> Result<ResultSet, SimpleDbError> {
        let sql = self.translate(&query.query);
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.run(&sql, &query.params),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.run(&sql, &query.params),
        }
    }

    /// Execute raw SQL (possibly several statements) without parameters.
    ///
    /// # Errors
    /// Returns the driver error if any statement fails.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.execute_batch(sql),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.execute_batch(sql),
        }
    }

    /// Identifier generated by the most recent insert on this connection.
    ///
    /// # Errors
    /// Returns the driver error when the engine has no such value yet.
    pub fn last_insert_id(&mut self, id_column: Option<&str>) -> Result<i64, SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => Ok(conn.last_insert_id(id_column)),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.last_insert_id(id_column),
        }
    }

    /// Engine-specific query whose `Auto_increment` column is the next id of `table`.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ParameterError` for an invalid table name.
    pub fn next_id_query(&mut self, table: &str) -> Result<QueryAndParams, SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.next_id_query(table),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.next_id_query(table),
        }
    }

    /// # Errors
    /// Returns `SimpleDbError` if a transaction is already open or BEGIN fails.
    pub fn begin(&mut self) -> Result<(), SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.begin(),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.begin(),
        }
    }

    /// # Errors
    /// Returns `SimpleDbError` if no transaction is open or COMMIT fails.
    pub fn commit(&mut self) -> Result<(), SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.commit(),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.commit(),
        }
    }

    /// # Errors
    /// Returns `SimpleDbError` if no transaction is open or ROLLBACK fails.
    pub fn rollback(&mut self) -> Result<(), SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.rollback(),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.rollback(),
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.in_transaction(),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.in_transaction(),
        }
    }

    /// Close the underlying connection.
    ///
    /// # Errors
    /// Returns the driver error if the engine refuses to close cleanly.
    pub fn close(self) -> Result<(), SimpleDbError> {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite { conn, .. } => conn.close(),
            #[cfg(feature = "postgres")]
            Self::Postgres { conn, .. } => conn.close(),
        }
    }
}
