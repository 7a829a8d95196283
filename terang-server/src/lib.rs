//! HTTP server for Toko Buku & Kopi Terang.
//!
//! Serves the public catalog as JSON, session endpoints for staff, and
//! the admin API behind [`AdminGateMiddleware`]. Every request reaches
//! the backend as its caller: the access token comes from the session
//! cookie or a bearer header.
//!
//! ```no_run
//! use std::sync::Arc;
//! use terang_backend::MemoryBackend;
//! use terang_server::{AppState, Application, HttpRequest};
//!
//! # async fn example() -> terang_server::Result<()> {
//! let app = Application::new(AppState::new(Arc::new(MemoryBackend::new())))?;
//! let response = app.handle(HttpRequest::new("GET", "/api/books?q=kopi")).await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

mod app;
mod error;
pub mod handlers;
mod http;
mod middleware;
mod router;
mod state;

pub use app::{Application, shutdown_signal};
pub use error::{Result, ServerError};
pub use http::{HttpRequest, HttpResponse, parse_cookies};
pub use middleware::{
    AdminGateMiddleware, HandlerFn, HandlerFuture, LoggerMiddleware, Middleware,
    MiddlewareChain, Next, RequestIdMiddleware,
};
pub use router::{Router, parse_query_string};
pub use state::AppState;
