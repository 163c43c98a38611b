//! The persistent cache worker.
//!
//! ### Lifecycle
//! - `install` precaches the shell set into the HTML store and opens the
//!   static store; the shell set is all-or-nothing
//! - `activate` deletes every store outside the current generation
//! - Only an active worker intercepts
//!
//! ### Policies
//! - Documents: stale-while-revalidate against the HTML store
//! - Scripts, styles, fonts and static prefixes: network-first with cache
//!   fallback against the static store
//! - Cache writes and revalidation run detached; a store error never fails a
//!   response
//! - Only success responses up to `max_entry_bytes` are stored; larger ones
//!   are still returned

use super::generation::CacheGeneration;
use super::network::Network;
use super::request::{RequestClass, WorkerRequest, WorkerResponse};
use parking_lot::Mutex;
use reqwest::Method;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use swapnav_core::{AppConfig, CacheDb, Error};
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Activating,
    Active,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

/// What the worker did with a request.
#[derive(Debug)]
pub enum FetchDecision {
    /// Not intercepted; the request goes to the network untouched.
    Passthrough,
    Respond {
        response: WorkerResponse,
        source: ResponseSource,
        /// Detached revalidation or cache write, if one was started.
        background: Option<JoinHandle<()>>,
    },
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Origin the worker is registered for.
    pub origin: Url,
    pub generation: CacheGeneration,
    pub precache_paths: Vec<String>,
    pub static_prefixes: Vec<String>,
    /// Largest response body the worker will store.
    pub max_entry_bytes: usize,
}

impl WorkerConfig {
    pub fn new(origin: Url, config: &AppConfig) -> Self {
        Self {
            origin,
            generation: CacheGeneration::from(config),
            precache_paths: config.precache_paths.clone(),
            static_prefixes: config.static_prefixes.clone(),
            max_entry_bytes: config.max_bytes,
        }
    }
}

pub struct CacheWorker {
    db: CacheDb,
    network: Arc<dyn Network>,
    config: WorkerConfig,
    state: Mutex<LifecycleState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    save_data: AtomicBool,
}

impl CacheWorker {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: WorkerConfig) -> Self {
        Self {
            db,
            network,
            config,
            state: Mutex::new(LifecycleState::Installing),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            save_data: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn generation(&self) -> &CacheGeneration {
        &self.config.generation
    }

    /// Whether install asked to take over without waiting for old clients.
    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claims_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Connection-level reduced-data hint; disables interception while set.
    pub fn set_save_data(&self, save_data: bool) {
        self.save_data.store(save_data, Ordering::SeqCst);
    }

    fn expect_state(&self, expected: LifecycleState, operation: &str) -> Result<(), Error> {
        let state = self.state();
        if state != expected {
            return Err(Error::Lifecycle(format!("{operation} called while {state:?}")));
        }
        Ok(())
    }

    /// Precache the shell set and open both stores.
    ///
    /// Shell pages already held by the current HTML store are not fetched
    /// again; documents revalidate on use anyway.
    ///
    /// # Errors
    ///
    /// Any precache fetch that fails or answers non-success fails the whole
    /// install and nothing is written.
    pub async fn install(&self) -> Result<(), Error> {
        self.expect_state(LifecycleState::Installing, "install")?;
        let generation = &self.config.generation;

        self.db.open_store(&generation.html).await?;

        let mut shell = Vec::with_capacity(self.config.precache_paths.len());
        for path in &self.config.precache_paths {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|e| Error::InvalidUrl(format!("precache path {path:?}: {e}")))?;
            if self.db.match_url(&generation.html, url.as_str()).await?.is_some() {
                tracing::trace!(%url, "shell page already cached");
                continue;
            }
            let response = self.network.fetch(&WorkerRequest::navigation(url.clone())).await?;
            if !response.is_success() {
                return Err(Error::HttpError(format!("precache {} answered {}", url, response.status)));
            }
            shell.push(response.to_stored(&url));
        }
        for stored in &shell {
            self.db.put(&generation.html, stored).await?;
        }

        self.db.open_store(&generation.static_assets).await?;

        self.skip_waiting.store(true, Ordering::SeqCst);
        *self.state.lock() = LifecycleState::Activating;
        tracing::info!(store = %generation.html, precached = shell.len(), "worker installed");

        Ok(())
    }

    /// Delete stores from other generations, then start intercepting.
    ///
    /// Returns the names of the deleted stores.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.expect_state(LifecycleState::Activating, "activate")?;

        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if self.config.generation.contains(&name) {
                continue;
            }
            if self.db.delete_store(&name).await? {
                tracing::info!(store = %name, "deleted stale cache store");
                deleted.push(name);
            }
        }

        *self.state.lock() = LifecycleState::Active;
        self.clients_claimed.store(true, Ordering::SeqCst);
        tracing::info!(deleted = deleted.len(), "worker active");

        Ok(deleted)
    }

    /// Decide how to answer one request.
    ///
    /// # Errors
    ///
    /// Only when the network fails and no cached copy exists.
    pub async fn handle_fetch(&self, request: WorkerRequest) -> Result<FetchDecision, Error> {
        if self.state() != LifecycleState::Active
            || request.method != Method::GET
            || request.url.origin() != self.config.origin.origin()
            || self.save_data.load(Ordering::SeqCst)
            || request.wants_reduced_data()
        {
            return Ok(FetchDecision::Passthrough);
        }

        match request.classify(&self.config.static_prefixes) {
            RequestClass::Document => self.stale_while_revalidate(request).await,
            RequestClass::StaticAsset => self.network_first(request).await,
            RequestClass::Other => Ok(FetchDecision::Passthrough),
        }
    }

    async fn stale_while_revalidate(&self, request: WorkerRequest) -> Result<FetchDecision, Error> {
        let store = self.config.generation.html.clone();

        if let Some(response) = self.cached(&store, &request.url).await {
            tracing::debug!(url = %request.url, "serving cached document, revalidating");
            let background = self.spawn_revalidate(store, request);
            return Ok(FetchDecision::Respond { response, source: ResponseSource::Cache, background: Some(background) });
        }

        let response = self.network.fetch(&request).await?;
        let background = storable(&response, self.config.max_entry_bytes)
            .then(|| self.spawn_put(store, &request.url, &response));
        Ok(FetchDecision::Respond { response, source: ResponseSource::Network, background })
    }

    async fn network_first(&self, request: WorkerRequest) -> Result<FetchDecision, Error> {
        let store = self.config.generation.static_assets.clone();

        let failure = match self.network.fetch(&request).await {
            Ok(response) if response.is_success() => {
                let background = storable(&response, self.config.max_entry_bytes)
                    .then(|| self.spawn_put(store, &request.url, &response));
                return Ok(FetchDecision::Respond { response, source: ResponseSource::Network, background });
            }
            Ok(response) => Ok(response),
            Err(e) => Err(e),
        };

        if let Some(response) = self.cached(&store, &request.url).await {
            tracing::debug!(url = %request.url, "network failed, serving cached asset");
            return Ok(FetchDecision::Respond { response, source: ResponseSource::Cache, background: None });
        }

        let response = failure?;
        Ok(FetchDecision::Respond { response, source: ResponseSource::Network, background: None })
    }

    /// Cached response, treating store errors as a miss.
    async fn cached(&self, store: &str, url: &Url) -> Option<WorkerResponse> {
        let stored = match self.db.match_url(store, url.as_str()).await {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(%store, %url, error = %e, "cache read failed");
                return None;
            }
        };
        match WorkerResponse::try_from(stored) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(%store, %url, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn spawn_put(&self, store: String, url: &Url, response: &WorkerResponse) -> JoinHandle<()> {
        let db = self.db.clone();
        let stored = response.to_stored(url);
        tokio::spawn(async move {
            if let Err(e) = db.put(&store, &stored).await {
                tracing::warn!(%store, url = %stored.url, error = %e, "cache write failed");
            }
        })
    }

    fn spawn_revalidate(&self, store: String, request: WorkerRequest) -> JoinHandle<()> {
        let db = self.db.clone();
        let network = Arc::clone(&self.network);
        let limit = self.config.max_entry_bytes;
        tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if storable(&response, limit) => {
                    if let Err(e) = db.put(&store, &response.to_stored(&request.url)).await {
                        tracing::warn!(%store, url = %request.url, error = %e, "cache write failed");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "revalidation not stored");
                }
                Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
            }
        })
    }
}

fn storable(response: &WorkerResponse, limit: usize) -> bool {
    if !response.is_success() {
        return false;
    }
    if response.body.len() > limit {
        tracing::debug!(url = %response.url, bytes = response.body.len(), limit, "response too large to cache");
        return false;
    }
    true
}
