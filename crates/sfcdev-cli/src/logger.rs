//! Logging setup on the `tracing` ecosystem.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Level resolution order: `--verbose` (debug for sfcdev crates),
/// `--quiet` (errors only), the `RUST_LOG` environment variable, then
/// an info-level default.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("sfcdev_core=debug,sfcdev_cli=debug")
    } else if quiet {
        EnvFilter::new("sfcdev_core=error,sfcdev_cli=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sfcdev_core=info,sfcdev_cli=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr);

    // Ignore the error if a subscriber is already set (tests).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
