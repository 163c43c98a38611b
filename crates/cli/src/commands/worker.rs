//! Requests through the persistent cache worker.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use swapnav_client::worker::{CacheGeneration, ResponseSource};
use swapnav_client::{
    CacheWorker, FetchClient, FetchConfig, FetchDecision, Network, WorkerConfig, WorkerRegistration, WorkerRequest,
};
use swapnav_core::{AppConfig, CacheDb};
use url::Url;

#[derive(Debug, Serialize)]
struct RequestReport {
    url: String,
    status: u16,
    source: &'static str,
    bytes: usize,
}

#[derive(Debug, Serialize)]
struct WarmReport {
    html_store: String,
    static_store: String,
    results: Vec<RequestReport>,
}

/// Build an active worker for the origin of `url`.
///
/// Every invocation registers afresh; install skips shell pages the current
/// generation already stores, so only the first run fetches them.
async fn ready_worker(config: &AppConfig, db: &CacheDb, url: &Url) -> Result<(Arc<CacheWorker>, Arc<FetchClient>)> {
    let origin = url.join("/").with_context(|| format!("{url} has no origin to register for"))?;
    let client = Arc::new(FetchClient::new(FetchConfig::from(config))?);
    let registration = WorkerRegistration::new(db.clone(), client.clone(), WorkerConfig::new(origin, config));
    let worker = registration.ensure_ready().await?;
    Ok((worker, client))
}

/// Run one request and wait for any cache write it started.
async fn run(worker: &CacheWorker, client: &FetchClient, request: WorkerRequest) -> Result<RequestReport> {
    let url = request.url.to_string();
    let (response, source) = match worker.handle_fetch(request.clone()).await? {
        FetchDecision::Passthrough => (client.fetch(&request).await?, "passthrough"),
        FetchDecision::Respond { response, source, background } => {
            if let Some(task) = background {
                task.await?;
            }
            let source = match source {
                ResponseSource::Cache => "cache",
                ResponseSource::Network => "network",
            };
            (response, source)
        }
    };
    Ok(RequestReport { url, status: response.status, source, bytes: response.body.len() })
}

pub async fn warm(config: &AppConfig, db: &CacheDb, urls: &[Url]) -> Result<Value> {
    let first = urls.first().context("no URLs to warm")?;
    let (worker, client) = ready_worker(config, db, first).await?;

    let mut results = Vec::with_capacity(urls.len());
    for url in urls {
        let report = run(&worker, &client, WorkerRequest::navigation(url.clone())).await?;
        tracing::info!(url = %report.url, source = report.source, status = report.status, "warmed");
        results.push(report);
    }

    let CacheGeneration { html, static_assets } = worker.generation().clone();
    Ok(serde_json::to_value(WarmReport { html_store: html, static_store: static_assets, results })?)
}

pub async fn fetch(config: &AppConfig, db: &CacheDb, url: Url, asset: bool) -> Result<Value> {
    let (worker, client) = ready_worker(config, db, &url).await?;
    let request = if asset { WorkerRequest::subresource(url) } else { WorkerRequest::navigation(url) };
    Ok(serde_json::to_value(run(&worker, &client, request).await?)?)
}
