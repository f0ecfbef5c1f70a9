//! uigrab - component extraction CLI
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uigrab::cli::{commands, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Build configuration
    let config = commands::load_config(&cli)?;

    let default_filter = if config.debug || cli.wants_debug() {
        "uigrab=debug"
    } else {
        "uigrab=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    commands::run(cli, config).await
}
