// Error types for the HTTP server

use terang_auth::AuthError;
use terang_backend::BackendError;
use terang_catalog::CatalogError;
use terang_config::ConfigError;
use terang_storage::StorageError;
use thiserror::Error;

use crate::HttpResponse;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Payload too large: limit is {0} bytes")]
    PayloadTooLarge(u64),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid route: {0}")]
    Route(#[from] matchit::InsertError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Hyper(#[from] hyper::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

fn backend_status(error: &BackendError) -> u16 {
    match error {
        BackendError::NotConfigured => 503,
        e if e.is_answer() => e.status_code().unwrap_or(400),
        _ => 502,
    }
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RouteNotFound(_) | Self::NotFound(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::PayloadTooLarge(_) => 413,
            Self::BadRequest(_) | Self::Deserialization(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Catalog(e) => e.status_code(),
            Self::Storage(e) => e.status_code(),
            Self::Auth(AuthError::Backend(e)) | Self::Backend(e) => backend_status(e),
            Self::Auth(e) => e.status_code(),
            Self::Serialization(_)
            | Self::Route(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Hyper(_) => 500,
        }
    }

    /// Message safe to show to the caller. Internal and transport
    /// failures are not described.
    pub fn public_message(&self) -> String {
        let status = self.status_code();
        match self {
            Self::Backend(BackendError::NotConfigured)
            | Self::Catalog(CatalogError::Backend(BackendError::NotConfigured)) => self.to_string(),
            _ if status == 502 => "Backend unavailable".to_string(),
            _ if status >= 500 => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// JSON error response: `{error, status}`, or `{error, fields}` for
    /// rejected forms.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status_code();
        let body = match &self {
            Self::Catalog(CatalogError::Validation(errors)) => errors.to_json(),
            _ => serde_json::json!({
                "error": self.public_message(),
                "status": status,
            }),
        };
        HttpResponse::json_value(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServerError::RouteNotFound("GET /x".into()).status_code(), 404);
        assert_eq!(
            ServerError::from(BackendError::NotFound("no rows".into())).status_code(),
            404
        );
        assert_eq!(ServerError::from(BackendError::NotConfigured).status_code(), 503);
        assert_eq!(ServerError::from(AuthError::Unauthorized).status_code(), 401);

        let offline = ServerError::from(BackendError::Connection("refused".into()));
        assert_eq!(offline.status_code(), 502);
        assert_eq!(offline.public_message(), "Backend unavailable");
    }

    #[test]
    fn test_error_body() {
        let response = ServerError::BadRequest("missing field".into()).into_response();
        assert_eq!(response.status, 400);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"], "Bad Request: missing field");
    }
}
