//! Inspection of the persistent cache stores.

use anyhow::{Result, bail};
use serde::Serialize;
use serde_json::Value;
use swapnav_core::CacheDb;

#[derive(Debug, Serialize)]
struct StoreSummary {
    name: String,
    entries: usize,
}

#[derive(Debug, Serialize)]
struct StoreEntries {
    store: String,
    urls: Vec<String>,
}

pub async fn caches(db: &CacheDb) -> Result<Value> {
    let mut stores = Vec::new();
    for name in db.store_names().await? {
        let entries = db.store_urls(&name).await?.len();
        stores.push(StoreSummary { name, entries });
    }
    Ok(serde_json::to_value(stores)?)
}

pub async fn entries(db: &CacheDb, store: &str) -> Result<Value> {
    if !db.has_store(store).await? {
        bail!("no cache store named {store:?}");
    }
    let urls = db.store_urls(store).await?;
    Ok(serde_json::to_value(StoreEntries { store: store.to_string(), urls })?)
}
