//! One-time worker setup.

use super::lifecycle::{CacheWorker, WorkerConfig};
use super::network::Network;
use parking_lot::Mutex;
use std::sync::Arc;
use swapnav_core::{CacheDb, Error};

/// Where registration stands.
#[derive(Clone)]
pub enum RegistrationState {
    Uninitialized,
    /// Install and activate are running.
    Initializing,
    Ready(Arc<CacheWorker>),
}

impl RegistrationState {
    pub fn name(&self) -> &'static str {
        match self {
            RegistrationState::Uninitialized => "uninitialized",
            RegistrationState::Initializing => "initializing",
            RegistrationState::Ready(_) => "ready",
        }
    }
}

/// Installs and activates a worker exactly once.
///
/// Concurrent callers of [`WorkerRegistration::ensure_ready`] wait for the
/// single setup run; a failed run returns to `Uninitialized` so the next call
/// retries.
pub struct WorkerRegistration {
    db: CacheDb,
    network: Arc<dyn Network>,
    config: WorkerConfig,
    state: Mutex<RegistrationState>,
    setup: tokio::sync::Mutex<()>,
}

impl WorkerRegistration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, config: WorkerConfig) -> Self {
        Self {
            db,
            network,
            config,
            state: Mutex::new(RegistrationState::Uninitialized),
            setup: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state.lock().clone()
    }

    /// The active worker, if setup has completed.
    pub fn worker(&self) -> Option<Arc<CacheWorker>> {
        match &*self.state.lock() {
            RegistrationState::Ready(worker) => Some(Arc::clone(worker)),
            _ => None,
        }
    }

    /// Return the active worker, installing and activating it first if needed.
    pub async fn ensure_ready(&self) -> Result<Arc<CacheWorker>, Error> {
        if let Some(worker) = self.worker() {
            return Ok(worker);
        }

        let _guard = self.setup.lock().await;
        if let Some(worker) = self.worker() {
            return Ok(worker);
        }

        *self.state.lock() = RegistrationState::Initializing;
        let worker = Arc::new(CacheWorker::new(self.db.clone(), Arc::clone(&self.network), self.config.clone()));

        let result = async {
            worker.install().await?;
            worker.activate().await
        }
        .await;

        match result {
            Ok(deleted) => {
                tracing::info!(deleted = deleted.len(), "worker registered");
                *self.state.lock() = RegistrationState::Ready(Arc::clone(&worker));
                Ok(worker)
            }
            Err(e) => {
                tracing::warn!(error = %e, "worker registration failed");
                *self.state.lock() = RegistrationState::Uninitialized;
                Err(e)
            }
        }
    }
}
