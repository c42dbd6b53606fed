// PostgreSQL backend (tokio-postgres on a private current-thread runtime):
// - connection: open/run/transactions, blocking on the runtime per call
// - params: row values to PostgreSQL wire values
// - query: result extraction and building

pub mod connection;
pub mod params;
pub mod query;

pub use connection::PostgresConnection;
pub use params::Params as PostgresParams;
pub use query::build_result_set;
