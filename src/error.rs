use std::fmt;

use thiserror::Error;

/// Where opening a connection failed. The numeric code is what the fixed
/// "temporarily unavailable" message reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSite {
    /// The driver could not open or reach the server / file.
    Connect,
    /// The connection opened but the database could not be selected.
    SelectDatabase,
}

impl FailureSite {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            FailureSite::Connect => 1,
            FailureSite::SelectDatabase => 2,
        }
    }
}

impl fmt::Display for FailureSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E#{:03}", self.code())
    }
}

#[derive(Debug, Error)]
pub enum SimpleDbError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    /// Unrecoverable connection failure; `Display` is the user-facing message.
    #[error("{}", unavailable_message(.site, .detail))]
    Unavailable {
        site: FailureSite,
        detail: Option<String>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Connection already closed")]
    ConnectionClosed,

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Method not found: {0}.")]
    MethodNotFound(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl SimpleDbError {
    /// Build the fatal error for a failed connection attempt.
    #[must_use]
    pub fn unavailable(site: FailureSite, detail: Option<String>) -> Self {
        SimpleDbError::Unavailable { site, detail }
    }

    /// True for the connection-establishment tier of failures.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimpleDbError::Unavailable { .. })
    }
}

fn unavailable_message(site: &FailureSite, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("The website is temporarily unavailable ({site} :: {detail})."),
        None => format!("The website is temporarily unavailable ({site})."),
    }
}
