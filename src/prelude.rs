//! Convenient imports for common functionality.
//!
//! ```rust
//! use simple_db::prelude::*;
//! ```

pub use crate::config::{ConnectOptions, ConnectOptionsBuilder};
pub use crate::connection::Connection;
pub use crate::error::{FailureSite, SimpleDbError};
pub use crate::escape::{prepare, quote_identifier, quote_literal};
pub use crate::fatal::exit_unavailable;
pub use crate::legacy::{DEFAULT_SLOT, LegacyClient};
pub use crate::prepared::{CallOutput, Method, PreparedClient};
pub use crate::query_builder::{BuildAction, build};
pub use crate::results::{DbRow, ResultSet};
pub use crate::statement::Statement;
pub use crate::translation::{PlaceholderStyle, bind_named, translate_placeholders};
pub use crate::types::{DatabaseType, Params, QueryAndParams, RowValues};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConnection, PostgresParams};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteParams};
