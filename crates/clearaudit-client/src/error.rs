//! Backend error classification.

use clearaudit_core::Error;
use serde::Deserialize;

/// Error classes derived from the backend's HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Missing or rejected credentials (401/403).
    Unauthorized,
    /// Entity does not exist (404).
    NotFound,
    /// Request body rejected by the backend (400/422).
    Validation,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Server error (5xx).
    ServerError,
    /// Unknown error.
    Unknown,
}

impl ApiErrorCode {
    /// Determine error code from HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            400 | 422 => Self::Validation,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if a manual retry of the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError)
    }
}

/// FastAPI error body: `{"detail": "..."}`. `detail` is a list for 422s.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ErrorBody {
    pub(crate) fn message(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Convert a non-2xx response into the client error taxonomy.
///
/// Backend-side rejections stay `RequestFailed` (a mutation the backend
/// refused is a failed request, not a local validation error); only 404 maps
/// to `NotFound`.
pub fn to_audit_error(status: u16, context: &str, message: &str) -> Error {
    match ApiErrorCode::from_status(status) {
        ApiErrorCode::NotFound => Error::NotFound(format!("{}: {}", context, message)),
        ApiErrorCode::Unauthorized => Error::RequestFailed(format!(
            "{} unauthorized ({}): {}",
            context, status, message
        )),
        ApiErrorCode::RateLimited => Error::RequestFailed(format!(
            "{} rate limited ({}): {}",
            context, status, message
        )),
        _ => Error::RequestFailed(format!("{} returned {}: {}", context, status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_401() {
        assert_eq!(ApiErrorCode::from_status(401), ApiErrorCode::Unauthorized);
        assert_eq!(ApiErrorCode::from_status(403), ApiErrorCode::Unauthorized);
    }

    #[test]
    fn test_error_code_from_404() {
        assert_eq!(ApiErrorCode::from_status(404), ApiErrorCode::NotFound);
    }

    #[test]
    fn test_error_code_from_422() {
        assert_eq!(ApiErrorCode::from_status(422), ApiErrorCode::Validation);
    }

    #[test]
    fn test_error_code_from_5xx() {
        assert_eq!(ApiErrorCode::from_status(500), ApiErrorCode::ServerError);
        assert_eq!(ApiErrorCode::from_status(503), ApiErrorCode::ServerError);
    }

    #[test]
    fn test_error_code_from_unknown() {
        assert_eq!(ApiErrorCode::from_status(418), ApiErrorCode::Unknown);
    }

    #[test]
    fn test_retryable() {
        assert!(ApiErrorCode::RateLimited.is_retryable());
        assert!(ApiErrorCode::ServerError.is_retryable());
        assert!(!ApiErrorCode::NotFound.is_retryable());
        assert!(!ApiErrorCode::Validation.is_retryable());
    }

    #[test]
    fn test_to_audit_error_not_found() {
        let err = to_audit_error(404, "GET /documents/9/extraction", "Document not found");
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("Document not found"));
    }

    #[test]
    fn test_to_audit_error_server() {
        let err = to_audit_error(500, "POST /documents/7/analyze", "boom");
        assert!(matches!(err, Error::RequestFailed(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Finding not found"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Finding not found"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail": [{"loc": ["body"]}]}"#).unwrap();
        assert!(body.message().unwrap().contains("loc"));

        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message().is_none());
    }
}
