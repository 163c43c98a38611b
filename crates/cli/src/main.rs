//! swapnav command-line entry point.
//!
//! Command output is JSON on stdout. Logging goes to stderr so the two never
//! mix; set `RUST_LOG` to see it.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = args::Cli::parse();
    commands::dispatch(cli).await
}
