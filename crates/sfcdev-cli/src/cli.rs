//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// sfcdev - a development server for single-file components
///
/// Serves `.vue` components and plain `.js` modules straight from the
/// filesystem, compiling on demand and rewriting bare imports to the
/// virtual `/__modules/` route. No build step, no bundling.
#[derive(Parser, Debug)]
#[command(
    name = "sfcdev",
    version,
    about = "Development server for single-file components"
)]
pub struct Cli {
    /// Port to listen on (falls back to the next free port if busy)
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Directory to serve; request paths resolve against it
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Disable the compile cache; every request recomputes from scratch
    #[arg(long)]
    pub no_cache: bool,

    /// Weight budget for the compile cache
    /// (entry weight = 2 x payload length + key length)
    #[arg(long, default_value_t = sfcdev_core::DEFAULT_MAX_WEIGHT)]
    pub cache_weight: usize,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}
