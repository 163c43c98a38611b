use clap::{Parser, Subcommand};
use std::path::PathBuf;
use swapnav_client::fetch::canonicalize;
use swapnav_core::AppConfig;
use url::Url;

/// Accept bare hosts like `films.example/years/` as https URLs.
fn parse_url(input: &str) -> Result<Url, String> {
    canonicalize(input).map_err(|e| e.to_string())
}

#[derive(Debug, Parser)]
#[command(name = "swapnav", version, about = "Two-tier navigation cache: session swaps and a persistent worker")]
pub struct Cli {
    /// Cache database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Version token of the HTML store
    #[arg(long, global = true)]
    pub html_version: Option<String>,

    /// Version token of the static-asset store
    #[arg(long, global = true)]
    pub static_version: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register the worker, then request each URL through it as a navigation
    Warm {
        #[arg(required = true, value_parser = parse_url)]
        urls: Vec<Url>,
    },
    /// Send one request through the worker
    Fetch {
        #[arg(value_parser = parse_url)]
        url: Url,
        /// Request as a subresource instead of a navigation
        #[arg(long)]
        asset: bool,
    },
    /// List persistent cache stores
    Caches,
    /// List request URLs held by a store
    Entries { store: String },
    /// Load a page headlessly, hover then click a link on it
    Swap {
        #[arg(value_parser = parse_url)]
        from: Url,
        /// Link href, resolved against the loaded page
        to: String,
    },
}

impl Cli {
    /// Apply global flags on top of loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(version) = &self.html_version {
            config.html_cache_version = version.clone();
        }
        if let Some(version) = &self.static_version {
            config.static_cache_version = version.clone();
        }
    }
}
