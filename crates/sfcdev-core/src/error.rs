//! Error types for the serving pipeline.
//!
//! Every error here is fatal for the request that produced it: the
//! pipeline never retries and never writes partial cache entries, so a
//! failing request leaves cache state untouched.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving, compiling, or loading a servable
/// resource.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Source file is missing or unreadable.
    #[error("failed to read source {}: {source}", .path.display())]
    Read {
        /// Absolute path that failed to resolve
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// Request path resolved outside the serving root.
    #[error("request path escapes the serving root: {0}")]
    OutsideRoot(String),

    /// Component compilation failed; the message comes straight from
    /// the compiler, nothing is served.
    #[error("failed to compile {}: {message}", .file.display())]
    Compile {
        /// Component file that failed to compile
        file: PathBuf,
        /// Compiler diagnostic
        message: String,
    },

    /// Package name does not resolve to an installed dependency.
    #[error("cannot resolve package '{0}' in node_modules")]
    PackageNotFound(String),

    /// Package name is malformed (empty, traversal, absolute).
    #[error("invalid package name '{0}'")]
    InvalidPackageName(String),

    /// Other filesystem errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ServeError`] as the default error type.
pub type Result<T, E = ServeError> = std::result::Result<T, E>;
