//! Helpers for tests that need a real Postgres server.

use std::sync::LazyLock;

use tokio::runtime::{Builder, Runtime};

/// Runtime that drives the embedded server's setup and shutdown.
pub(crate) static SHARED_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime for test utilities")
});

pub mod postgres;

pub use postgres::*;
