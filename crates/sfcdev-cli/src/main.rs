//! sfcdev - development server for single-file components.

use clap::Parser;
use miette::Result;
use sfcdev_cli::{cli, error, logger, server, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    if args.no_cache {
        ui::warning("Cache disabled: every request recompiles from scratch");
    }

    let result = async {
        let server = server::DevServer::from_args(&args)?;
        server.start().await
    }
    .await;

    result.map_err(error::cli_error_to_miette)
}
