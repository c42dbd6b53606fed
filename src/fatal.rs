//! Process halt for unrecoverable connection failures.

use std::process;

use crate::error::SimpleDbError;

/// Exit status used when the database cannot be reached.
pub const UNAVAILABLE_EXIT_CODE: i32 = 1;

/// Print the error's user-facing message to stderr and exit the process.
///
/// Intended for binaries that want the all-or-nothing startup behavior; library code returns
/// [`SimpleDbError::Unavailable`] instead.
pub fn exit_unavailable(err: &SimpleDbError) -> ! {
    tracing::error!(error = %err, "exiting: database unavailable");
    eprintln!("{err}");
    process::exit(UNAVAILABLE_EXIT_CODE)
}
