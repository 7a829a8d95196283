//! Client for the hosted backend behind Terang.
//!
//! The backend offers three services: tables ([`Database`]), sessions
//! ([`Auth`]) and blobs ([`BlobStorage`]). [`Backend`] bundles one handle
//! to each. Two implementations exist:
//!
//! - [`RestBackend`] talks to the hosted service over HTTP.
//! - [`MemoryBackend`] keeps everything in process.
//!
//! # Example
//!
//! ```no_run
//! use terang_backend::{Backend, Direction, Query};
//! use terang_config::BackendConfig;
//!
//! # async fn example() -> terang_backend::Result<()> {
//! let backend = Backend::rest(&BackendConfig::new("https://abc.supabase.co", "anon-key"))?;
//! let books = backend
//!     .db
//!     .select(&Query::table("books").eq("is_published", true).order("created_at", Direction::Desc))
//!     .await?;
//! println!("{} books", books.len());
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod database;
mod error;
mod memory;
mod query;
mod request;
mod response;
mod rest;
mod storage;

pub use auth::{Auth, AuthChange, AuthEvent, AuthEvents, AuthSubscription, Session, User};
pub use client::{HttpClient, HttpClientConfig};
pub use database::Database;
pub use error::{BackendError, Result};
pub use memory::{Failure, MemoryBackend, STAFF_ROLES};
pub use query::{Direction, Filter, Order, Query};
pub use request::RequestBuilder;
pub use response::Response;
pub use rest::{RestBackend, RestConnector};
pub use storage::BlobStorage;

use serde_json::json;
use std::sync::Arc;
use terang_config::BackendConfig;

/// Handles to the three backend services.
#[derive(Clone)]
pub struct Backend {
    pub db: Arc<dyn Database>,
    pub auth: Arc<dyn Auth>,
    pub storage: Arc<dyn BlobStorage>,
}

impl Backend {
    pub fn new(
        db: Arc<dyn Database>,
        auth: Arc<dyn Auth>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        Self { db, auth, storage }
    }

    /// Anonymous REST client for `config`.
    pub fn rest(config: &BackendConfig) -> Result<Self> {
        Ok(RestBackend::new(config)?.into_backend())
    }

    /// Call the `is_staff` procedure for the current session.
    pub async fn is_staff(&self) -> Result<bool> {
        let value = self.db.rpc("is_staff", json!({})).await?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

/// Produces [`Backend`] handles bound to a caller's access token.
pub trait Connect: Send + Sync {
    /// False when the backend URL or key is missing.
    fn is_configured(&self) -> bool {
        true
    }

    fn connect(&self, access_token: Option<&str>) -> Result<Backend>;
}
