//! Error types for the ClearAudit client.

use thiserror::Error;

/// Result type alias using ClearAudit's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ClearAudit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP/network request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Backend reported failure for a submitted job
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Polling exhausted its attempts before the job reached a terminal state
    #[error("Task timed out: {task_id} still running after {attempts} attempts")]
    TaskTimeout { task_id: String, attempts: u32 },

    /// Operation rejected before any network call
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Resource not found (backend 404 or not present in the local store)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Poll abandoned through its cancellation token
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error leaves the backend job possibly still running.
    ///
    /// Callers use this to offer a manual re-check instead of a retry.
    pub fn is_recheckable(&self) -> bool {
        matches!(self, Error::TaskTimeout { .. } | Error::Cancelled(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::RequestFailed(e.to_string())
    }
}
