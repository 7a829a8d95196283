//! Backend error types.

use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Backend errors.
///
/// `Api`, `NotFound` and `Unauthorized` mean the service answered and
/// refused; everything else means no usable answer came back.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The service answered with an error payload.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// A single-row query matched nothing.
    #[error("{0}")]
    NotFound(String),

    /// No signed-in user for an operation that needs one.
    #[error("Not authenticated")]
    Unauthorized,

    /// Backend URL or key is not configured.
    #[error(
        "Backend configuration missing. Set TERANG_BACKEND_URL and TERANG_BACKEND_ANON_KEY."
    )]
    NotConfigured,

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request could not be built.
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Connection or transport failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    /// Build an API error from a status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// True when the service itself answered with an error.
    pub fn is_answer(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::NotFound(_) | Self::Unauthorized
        )
    }

    /// True when the request never produced a usable answer.
    pub fn is_transport(&self) -> bool {
        !self.is_answer()
    }

    /// Get the HTTP status code if one is known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Unauthorized => Some(401),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<url::ParseError> for BackendError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<terang_config::ConfigError> for BackendError {
    fn from(e: terang_config::ConfigError) -> Self {
        match e {
            terang_config::ConfigError::BackendMissing => Self::NotConfigured,
            other => Self::InvalidUrl(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_vs_transport() {
        assert!(BackendError::api(400, "bad").is_answer());
        assert!(BackendError::NotFound("gone".into()).is_answer());
        assert!(BackendError::Connection("refused".into()).is_transport());
        assert!(BackendError::Json("eof".into()).is_transport());
    }

    #[test]
    fn test_api_display_is_message() {
        let err = BackendError::api(409, "duplicate key value");
        assert_eq!(err.to_string(), "duplicate key value");
        assert_eq!(err.status_code(), Some(409));
    }
}
