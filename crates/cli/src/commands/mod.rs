//! Subcommand implementations. Each returns a JSON value for stdout.

mod cache;
mod swap;
mod worker;

use crate::args::{Cli, Command};
use anyhow::Result;
use swapnav_core::{AppConfig, CacheDb};

pub async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let output = match cli.command {
        Command::Warm { urls } => worker::warm(&config, &open_db(&config).await?, &urls).await?,
        Command::Fetch { url, asset } => worker::fetch(&config, &open_db(&config).await?, url, asset).await?,
        Command::Caches => cache::caches(&open_db(&config).await?).await?,
        Command::Entries { store } => cache::entries(&open_db(&config).await?, &store).await?,
        Command::Swap { from, to } => swap::swap(&config, from, &to).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn open_db(config: &AppConfig) -> Result<CacheDb> {
    tracing::debug!(path = %config.db_path.display(), "opening cache database");
    Ok(CacheDb::open(&config.db_path).await?)
}
