use serde::Deserialize;

use crate::error::SimpleDbError;
use crate::types::DatabaseType;

/// Default Postgres port when none is configured.
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Everything needed to open one connection.
///
/// For `SQLite`, `database` is the file path (or `:memory:`) and host/user/password are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub engine: DatabaseType,
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Rewrite `?N` / `$N` placeholders to the engine's style before binding.
    pub translate_placeholders: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            engine: DatabaseType::default(),
            host: "localhost".to_string(),
            port: None,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            translate_placeholders: false,
        }
    }
}

impl ConnectOptions {
    /// Options from host, database, user and password, in that order.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder() -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::default()
    }

    /// `SQLite` options for a file path or `:memory:`.
    #[must_use]
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            engine: DatabaseType::Sqlite,
            database: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: DatabaseType) -> Self {
        self.engine = engine;
        self
    }

    /// Parse a DSN of the form `engine:dbname=NAME;host=HOST;port=PORT`.
    ///
    /// ```rust
    /// use simple_db::prelude::*;
    ///
    /// let opts = ConnectOptions::from_dsn("sqlite:dbname=:memory:", "", "").unwrap();
    /// assert_eq!(opts.engine, DatabaseType::Sqlite);
    /// assert_eq!(opts.database, ":memory:");
    /// ```
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConfigError` for a malformed DSN or unknown key, and the engine
    /// parse error for an unknown or unsupported engine.
    pub fn from_dsn(
        dsn: &str,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SimpleDbError> {
        let (engine, rest) = dsn.split_once(':').ok_or_else(|| {
            SimpleDbError::ConfigError(format!("DSN `{dsn}` has no engine prefix"))
        })?;
        let mut opts = Self {
            engine: engine.parse()?,
            user: user.into(),
            password: password.into(),
            ..Self::default()
        };
        for pair in rest.split(';').filter(|pair| !pair.trim().is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                SimpleDbError::ConfigError(format!("DSN entry `{pair}` is not key=value"))
            })?;
            let value = value.trim();
            match key.trim() {
                "dbname" => opts.database = value.to_string(),
                "host" => opts.host = value.to_string(),
                "port" => {
                    opts.port = Some(value.parse().map_err(|e| {
                        SimpleDbError::ConfigError(format!("invalid port `{value}`: {e}"))
                    })?);
                }
                other => {
                    return Err(SimpleDbError::ConfigError(format!(
                        "unknown DSN key `{other}`"
                    )));
                }
            }
        }
        opts.validate()?;
        Ok(opts)
    }

    /// Deserialize options from JSON, e.g. a config file's contents.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConfigError` if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, SimpleDbError> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| SimpleDbError::ConfigError(format!("invalid connection config: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check that the fields the engine needs are present.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SimpleDbError> {
        if self.database.is_empty() {
            return Err(SimpleDbError::ConfigError("database is required".to_string()));
        }
        match self.engine {
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Ok(()),
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => {
                if self.host.is_empty() {
                    return Err(SimpleDbError::ConfigError("host is required".to_string()));
                }
                if self.user.is_empty() {
                    return Err(SimpleDbError::ConfigError("user is required".to_string()));
                }
                Ok(())
            }
        }
    }

    /// Port to connect to, with the engine default filled in.
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_POSTGRES_PORT)
    }
}

/// Fluent builder for [`ConnectOptions`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptionsBuilder {
    opts: ConnectOptions,
}

impl ConnectOptionsBuilder {
    #[must_use]
    pub fn engine(mut self, engine: DatabaseType) -> Self {
        self.opts.engine = engine;
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = Some(port);
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.opts.database = database.into();
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = user.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = password.into();
        self
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.opts.translate_placeholders = translate_placeholders;
        self
    }

    /// Finish without validating.
    #[must_use]
    pub fn finish(self) -> ConnectOptions {
        self.opts
    }

    /// Finish and validate.
    ///
    /// # Errors
    /// Returns `SimpleDbError::ConfigError` if a required field is missing.
    pub fn build(self) -> Result<ConnectOptions, SimpleDbError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}
