// Catalog error types

use terang_backend::BackendError;
use thiserror::Error;

use crate::ValidationErrors;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A row came back in a shape the model does not accept.
    #[error("Invalid {table} row: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl CatalogError {
    pub(crate) fn decode(table: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { table, source }
    }

    /// True when the backend answered and refused.
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_answer())
    }

    /// Message for resource state: the backend's own message for answers
    /// and validation failures, `fallback` for everything else.
    pub fn message_or(&self, fallback: impl Into<String>) -> String {
        match self {
            Self::Backend(e) if e.is_answer() => e.to_string(),
            Self::Validation(e) => e.alert.to_string(),
            _ => fallback.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Backend(e) => match e {
                BackendError::NotConfigured => 503,
                e if e.is_answer() => e.status_code().unwrap_or(400),
                _ => 502,
            },
            Self::Decode { .. } => 500,
            Self::Validation(_) => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let answer = CatalogError::from(BackendError::api(400, "duplicate key"));
        assert!(answer.is_answer());
        assert_eq!(answer.message_or("Failed to create book"), "duplicate key");
        assert_eq!(answer.status_code(), 400);

        let offline = CatalogError::from(BackendError::Connection("refused".into()));
        assert_eq!(offline.message_or("Failed to create book"), "Failed to create book");
        assert_eq!(offline.status_code(), 502);

        let missing = CatalogError::from(BackendError::NotFound("no rows".into()));
        assert_eq!(missing.status_code(), 404);
    }
}
