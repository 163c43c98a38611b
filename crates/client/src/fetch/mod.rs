//! HTTP fetch pipeline shared by both cache tiers.
//!
//! ### Session-tier document fetches
//! - Always GET, `Accept: text/html`
//! - Tagged with [`NAV_REQUEST_HEADER`] so servers and the worker can tell
//!   engine fetches apart from ordinary navigations
//! - Non-success status and oversized bodies are errors
//!
//! ### Worker pass-through fetches
//! - See [`crate::worker::network`]; the same client is reused without the
//!   body ceiling

pub mod url;

use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, page_key, resolve_href, same_document, same_origin};

use swapnav_core::{AppConfig, Error};

/// Header attached to every document fetch issued by the session tier.
pub const NAV_REQUEST_HEADER: &str = "x-swapnav";

/// Why the session tier is fetching a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    /// Speculative warm-up on user intent.
    Prefetch,
    /// The user activated a link or moved through history.
    Navigate,
}

impl FetchPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchPurpose::Prefetch => "prefetch",
            FetchPurpose::Navigate => "navigate",
        }
    }
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swapnav/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swapnav/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a document fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// HTTP client with body limits.
#[derive(Clone)]
pub struct FetchClient {
    pub(crate) http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch an HTML document for the session tier.
    ///
    /// A non-success status is an error; the body is not read in that case.
    pub async fn fetch_document(&self, url: &Url, purpose: FetchPurpose) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(NAV_REQUEST_HEADER, purpose.as_str())
            .send()
            .await
            .map_err(|e| Error::NetworkError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {} for {}", status.as_u16(), url)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = self.read_body(response).await?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            purpose = purpose.as_str(),
            "fetched {} -> {} in {}ms ({} bytes)",
            url,
            final_url,
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, fetch_ms })
    }

    /// Read a response body, enforcing `max_bytes`.
    async fn read_body(&self, response: reqwest::Response) -> Result<Bytes, Error> {
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkError(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        Ok(bytes)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}
