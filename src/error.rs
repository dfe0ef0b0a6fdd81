//! Error types for the builder examples

use hyper::StatusCode;

/// Result type for reconcilers and the manager
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reconcilers and the manager
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True when the API server answered 404 for the requested object.
    ///
    /// Only this kind is treated as an expected outcome (a delete-driven
    /// reconcile); every other kind must still propagate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// True when the API server rejected an update because of a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 409)
    }
}

/// Failure while mutating an admitted object
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// The request object could not be decoded
    #[error("failed to decode admission object: {0}")]
    Decode(#[source] serde_json::Error),
    /// The mutated object could not be encoded
    #[error("failed to encode mutated object: {0}")]
    Encode(#[source] serde_json::Error),
}

impl AdmissionError {
    /// HTTP status reported back to the API server
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::Decode(_) => StatusCode::BAD_REQUEST,
            AdmissionError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
