use swapnav_core::Error;

/// Failure of a session-tier fetch.
///
/// Cloneable because one result is handed to every waiter of a coalesced
/// request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    #[error("HTTP_ERROR: {0}")]
    Http(String),

    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    #[error("MISSING_CONTENT_REGION: {0}")]
    MissingContentRegion(String),

    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Other(String),
}

impl From<Error> for NavError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpError(msg) => NavError::Http(msg),
            Error::NetworkError(msg) | Error::FetchTooLarge(msg) => NavError::Network(msg),
            Error::MissingContentRegion(selector) => NavError::MissingContentRegion(selector),
            Error::InvalidUrl(msg) => NavError::InvalidUrl(msg),
            other => NavError::Other(other.to_string()),
        }
    }
}
