//! Requests and responses as seen by the worker.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use swapnav_core::{Error, StoredResponse};
use url::Url;

/// Request header a client sends to opt into reduced data.
pub const SAVE_DATA_HEADER: &str = "save-data";
/// Client hint for reduced data usage.
pub const REDUCED_DATA_HINT: &str = "sec-ch-prefers-reduced-data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// What the requested resource will be used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Script,
    Style,
    Font,
    Image,
    Empty,
}

impl Destination {
    /// Guess a subresource destination from a path's extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).unwrap_or_default();
        match ext.as_str() {
            "js" | "mjs" => Destination::Script,
            "css" => Destination::Style,
            "woff" | "woff2" | "ttf" | "otf" => Destination::Font,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "svg" => Destination::Image,
            _ => Destination::Empty,
        }
    }

    fn is_static(self) -> bool {
        matches!(self, Destination::Script | Destination::Style | Destination::Font)
    }
}

/// Which caching policy a request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Served stale-while-revalidate from the HTML store.
    Document,
    /// Served network-first from the static store.
    StaticAsset,
    Other,
}

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub headers: HeaderMap,
}

impl WorkerRequest {
    /// A top-level navigation to `url`.
    pub fn navigation(url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"));
        Self { method: Method::GET, url, mode: RequestMode::Navigate, destination: Destination::Document, headers }
    }

    /// A subresource GET, destination inferred from the path.
    pub fn subresource(url: Url) -> Self {
        let destination = Destination::from_path(url.path());
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        Self { method: Method::GET, url, mode: RequestMode::NoCors, destination, headers }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn accepts_html(&self) -> bool {
        self.header(ACCEPT.as_str()).is_some_and(|accept| accept.contains("text/html"))
    }

    /// Whether the request itself asks for reduced data.
    pub fn wants_reduced_data(&self) -> bool {
        self.header(SAVE_DATA_HEADER).is_some_and(|v| v.trim().eq_ignore_ascii_case("on"))
            || self
                .header(REDUCED_DATA_HINT)
                .is_some_and(|v| v.trim().trim_matches('"').eq_ignore_ascii_case("reduce"))
    }

    /// Classify by mode, accept header, destination and path.
    pub fn classify(&self, static_prefixes: &[String]) -> RequestClass {
        if self.mode == RequestMode::Navigate || self.destination == Destination::Document || self.accepts_html() {
            return RequestClass::Document;
        }
        if self.destination.is_static() || static_prefixes.iter().any(|p| self.url.path().starts_with(p.as_str())) {
            return RequestClass::StaticAsset;
        }
        RequestClass::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResponse {
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl WorkerResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Persistable copy keyed by `request_url`.
    pub fn to_stored(&self, request_url: &Url) -> StoredResponse {
        StoredResponse {
            url: request_url.to_string(),
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl TryFrom<StoredResponse> for WorkerResponse {
    type Error = Error;

    fn try_from(stored: StoredResponse) -> Result<Self, Self::Error> {
        let url = Url::parse(&stored.url).map_err(|e| Error::CorruptEntry(format!("{}: {}", stored.url, e)))?;
        Ok(Self { url, status: stored.status, headers: stored.headers, body: Bytes::from(stored.body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://films.example").unwrap().join(path).unwrap()
    }

    fn prefixes() -> Vec<String> {
        vec!["/static/".to_string(), "/assets/".to_string()]
    }

    #[test]
    fn test_navigation_is_document() {
        assert_eq!(WorkerRequest::navigation(url("/years/1999/")).classify(&prefixes()), RequestClass::Document);
    }

    #[test]
    fn test_fetch_accepting_html_is_document() {
        let request = WorkerRequest::subresource(url("/partials/nav")).with_header("accept", "text/html");
        assert_eq!(request.classify(&prefixes()), RequestClass::Document);
    }

    #[test]
    fn test_static_classification() {
        assert_eq!(WorkerRequest::subresource(url("/style.css")).classify(&prefixes()), RequestClass::StaticAsset);
        assert_eq!(WorkerRequest::subresource(url("/js/app.js")).classify(&prefixes()), RequestClass::StaticAsset);
        assert_eq!(WorkerRequest::subresource(url("/f/a.woff2")).classify(&prefixes()), RequestClass::StaticAsset);
        assert_eq!(
            WorkerRequest::subresource(url("/static/data.json")).classify(&prefixes()),
            RequestClass::StaticAsset
        );
        assert_eq!(WorkerRequest::subresource(url("/img/poster.jpg")).classify(&prefixes()), RequestClass::Other);
        assert_eq!(WorkerRequest::subresource(url("/api/search")).classify(&prefixes()), RequestClass::Other);
    }

    #[test]
    fn test_reduced_data_signals() {
        let plain = WorkerRequest::navigation(url("/"));
        assert!(!plain.wants_reduced_data());
        assert!(plain.clone().with_header("Save-Data", "on").wants_reduced_data());
        assert!(!plain.clone().with_header("Save-Data", "off").wants_reduced_data());
        assert!(plain.clone().with_header("Sec-CH-Prefers-Reduced-Data", "reduce").wants_reduced_data());
        assert!(plain.with_header("Sec-CH-Prefers-Reduced-Data", "\"reduce\"").wants_reduced_data());
    }

    #[test]
    fn test_stored_conversion_keeps_fields() {
        let response = WorkerResponse {
            url: url("/style.css"),
            status: 200,
            headers: vec![("content-type".into(), "text/css".into())],
            body: Bytes::from_static(b"p{}"),
        };
        let stored = response.to_stored(&url("/style.css"));
        assert_eq!(stored.url, "https://films.example/style.css");

        let back = WorkerResponse::try_from(stored).unwrap();
        assert_eq!(back, response);
        assert_eq!(back.header("Content-Type"), Some("text/css"));
    }

    #[test]
    fn test_corrupt_stored_url() {
        let stored = StoredResponse {
            url: "not a url".into(),
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
            stored_at: String::new(),
        };
        assert!(matches!(WorkerResponse::try_from(stored), Err(Error::CorruptEntry(_))));
    }
}
