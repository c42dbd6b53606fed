use postgresql_embedded::PostgreSQL;

use super::SHARED_RUNTIME;
use crate::config::ConnectOptions;
use crate::connection::Connection;
use crate::types::DatabaseType;

/// A running embedded `PostgreSQL` server and options that reach its test database.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub options: ConnectOptions,
}

/// Download-free (bundled) embedded server with `database` created on it.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, the database cannot be
/// created, or the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    database: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let (postgresql, options) = SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(database).await?;

        let settings = postgresql.settings();
        let options = ConnectOptions::builder()
            .engine(DatabaseType::Postgres)
            .host(settings.host.clone())
            .port(settings.port)
            .database(database)
            .user(settings.username.clone())
            .password(settings.password.clone())
            .build()?;
        Ok::<_, Box<dyn std::error::Error>>((postgresql, options))
    })?;

    tracing::debug!(port = options.port_or_default(), database, "embedded postgres started");

    // Connection owns its own runtime, so the check runs outside `block_on`.
    Connection::open(&options)?.close()?;

    Ok(EmbeddedPostgres {
        postgresql,
        options,
    })
}

/// Stop a server started by [`setup_postgres_embedded`].
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        if let Err(e) = postgresql.stop().await {
            tracing::warn!(error = %e, "failed to stop embedded postgres");
        }
    });
}
