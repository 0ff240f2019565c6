//! CLI error types.
//!
//! Pipeline errors from `sfcdev-core` convert automatically; `main`
//! turns the final error into a miette diagnostic for display.

use miette::Report;
use sfcdev_core::ServeError;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Errors from the serving pipeline
    #[error(transparent)]
    Serve(#[from] ServeError),

    /// Development server errors (bind failures, accept loop)
    #[error("Server error: {0}")]
    Server(String),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Convert a CliError to a miette Report for terminal display.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Serve(ServeError::Compile { file, message }) => {
            miette::miette!("Compile error in {}: {}", file.display(), message)
        }
        CliError::Server(msg) => miette::miette!("Server error: {}", msg),
        _ => miette::miette!("{}", err),
    }
}
