//! Blocking convenience wrappers over `rusqlite` and `tokio-postgres`.
//!
//! Two client shapes share one driver layer:
//!
//! - [`LegacyClient`]: results live in caller-numbered slots and failures come back as
//!   `false` / `None` / `0`.
//! - [`PreparedClient`]: named or positional parameters, one "last statement", and `Result`
//!   everywhere, plus [`PreparedClient::call`] for reaching connection and statement
//!   operations by name.
//!
//! ```rust
//! use simple_db::prelude::*;
//!
//! let mut db = LegacyClient::connect(&ConnectOptions::sqlite(":memory:"))?;
//! assert!(db.query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", DEFAULT_SLOT));
//! let id = db.query_id(format!("INSERT INTO t (v) VALUES ('{}')", db.prepare("it's")), 0);
//! assert_eq!(id, 1);
//! assert_eq!(db.get("SELECT v FROM t", 0), Some(RowValues::Text("it's".into())));
//! # Ok::<(), SimpleDbError>(())
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("simple-db needs at least one of the `sqlite` or `postgres` features");

pub mod prelude;

pub mod config;
pub mod connection;
pub mod error;
pub mod escape;
pub mod fatal;
pub mod legacy;
pub mod prepared;
pub mod query_builder;
pub mod results;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils-postgres")]
pub mod test_utils;

pub use config::{ConnectOptions, ConnectOptionsBuilder};
pub use connection::Connection;
pub use error::{FailureSite, SimpleDbError};
pub use legacy::{DEFAULT_SLOT, LegacyClient};
pub use prepared::{CallOutput, PreparedClient};
pub use query_builder::{BuildAction, build};
pub use results::{DbRow, ResultSet};
pub use statement::Statement;
pub use types::{DatabaseType, Params, QueryAndParams, RowValues};
