// Terang - catalog and staff tooling for Toko Buku & Kopi Terang
//
// This library bundles the backend client, the catalog with its live
// resources and mutations, staff authentication and image uploads.

// Re-export the catalog, the heart of the site
pub use terang_catalog::*;

pub use terang_backend;
pub use terang_catalog;
pub use terang_config;

#[cfg(feature = "log")]
pub use terang_log;

#[cfg(feature = "auth")]
pub use terang_auth;

#[cfg(feature = "storage")]
pub use terang_storage;

#[cfg(feature = "server")]
pub use terang_server;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Bean, Book, CatalogError, DashboardCounts, Entity, Event, ItemResource, ListResource,
        MenuItem, MutationOutcome, Mutations, Validate, ValidationErrors, Visibility,
    };
    pub use terang_backend::{Backend, BackendError, Connect, MemoryBackend, RestConnector};
    pub use terang_config::{BackendConfig, TerangConfig};

    #[cfg(feature = "auth")]
    pub use terang_auth::{AdminGate, AuthActions, AuthState, AuthWatcher, GuardDecision, Role};

    #[cfg(feature = "storage")]
    pub use terang_storage::{Bucket, FileValidator, UploadedFile, Uploader};

    #[cfg(feature = "server")]
    pub use terang_server::{AppState, Application};
}
