use thiserror::Error;

/// Failure of a single call to the chat backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} could not be completed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode chat reply: {0}")]
    Decode(String),

    #[error("failed to read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Returned by an image picker when the user refuses access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("permission denied: {0}")]
pub struct PermissionDenied(pub String);

#[derive(Debug, Error)]
pub enum GreenieError {
    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GreenieError>;
