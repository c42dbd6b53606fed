// SQLite backend (rusqlite):
// - connection: open/run/transactions on one blocking connection
// - params: row values to SQLite values
// - query: result extraction and building

pub mod connection;
pub mod params;
pub mod query;

pub use connection::SqliteConnection;
pub use params::Params as SqliteParams;
pub use query::build_result_set;
