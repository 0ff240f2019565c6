//! sfcdev CLI - development server for single-file components.
//!
//! Wraps the [`sfcdev_core`] compile-and-cache pipeline in an axum HTTP
//! server with a small command-line surface:
//!
//! - [`cli`] - clap argument definitions
//! - [`error`] - CLI error types and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`server`] - the HTTP server and static-file fallback
//! - [`ui`] - terminal status messages

pub mod cli;
pub mod error;
pub mod logger;
pub mod server;
pub mod ui;
