mod args;
mod progress;
mod run;
mod summary;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run::run(&cli)
}
