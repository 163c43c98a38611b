//! Unified error types for swapnav.
//!
//! Display strings carry an upper-case code prefix so log lines can be
//! grouped by failure class without parsing the message.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the session tier, the worker and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty store name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or resolved.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Server answered with a non-success status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Transport-level failure (connection refused, reset, timeout).
    #[error("NETWORK_ERROR: {0}")]
    NetworkError(String),

    /// Response body exceeded the configured ceiling.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Fetched document does not expose the content region.
    #[error("MISSING_CONTENT_REGION: {0}")]
    MissingContentRegion(String),

    /// No cached response for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers could not be (de)serialized.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Worker lifecycle method called out of order.
    #[error("LIFECYCLE_ERROR: {0}")]
    Lifecycle(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl Error {
    /// Whether this failure came from the network path rather than local state.
    ///
    /// The worker uses this to decide whether a cached copy may stand in.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkError(_) | Error::HttpError(_) | Error::FetchTooLarge(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("https://example.com/".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("https://example.com/"));
    }

    #[test]
    fn test_missing_region_display() {
        let err = Error::MissingContentRegion("#content".to_string());
        assert_eq!(err.to_string(), "MISSING_CONTENT_REGION: #content");
    }

    #[test]
    fn test_is_network() {
        assert!(Error::NetworkError("refused".into()).is_network());
        assert!(Error::HttpError("status 503".into()).is_network());
        assert!(!Error::Lifecycle("not installed".into()).is_network());
        assert!(!Error::CacheMiss("x".into()).is_network());
    }

    #[test]
    fn test_rusqlite_conversion() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("CACHE_ERROR"));
    }
}
