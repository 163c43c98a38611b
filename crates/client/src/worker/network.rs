//! The worker's path to the network.

use super::request::{WorkerRequest, WorkerResponse};
use crate::fetch::FetchClient;
use async_trait::async_trait;
use swapnav_core::Error;

/// Upstream for requests the worker forwards.
///
/// Any HTTP status is a successful fetch; only transport failures are errors.
/// Bodies are read whole with no size ceiling.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error>;
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, Error> {
        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Error::NetworkError(format!("{}: {}", request.url, e)))?;

        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkError(format!("failed to read {}: {}", request.url, e)))?;

        tracing::trace!(url = %request.url, status, bytes = body.len(), "network fetch");

        Ok(WorkerResponse { url, status, headers, body })
    }
}
