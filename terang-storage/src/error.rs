//! Storage error types.

use terang_backend::BackendError;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage and upload errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File validation failed.
    #[error("{0}")]
    Validation(#[from] crate::ValidationError),

    /// Multipart parsing error.
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// Bucket name is not one of the known buckets.
    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    /// Invalid object name.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Storage service error.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Convert to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(crate::ValidationError::TooLarge { .. }) => 413,
            Self::Validation(crate::ValidationError::TypeNotAllowed { .. }) => 415,
            Self::Multipart(_) | Self::InvalidFileName(_) => 400,
            Self::UnknownBucket(_) => 404,
            Self::Backend(e) => match e.status_code() {
                Some(status) if (400..600).contains(&status) => status,
                _ => 502,
            },
        }
    }
}

impl From<multer::Error> for StorageError {
    fn from(err: multer::Error) -> Self {
        Self::Multipart(err.to_string())
    }
}
