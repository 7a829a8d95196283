// Error types for authentication

use terang_backend::BackendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::InvalidProfile(_) => 500,
            Self::Backend(e) => e.status_code().unwrap_or(502),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
