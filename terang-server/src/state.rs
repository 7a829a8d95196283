// Shared application state

use std::sync::Arc;
use terang_backend::{Backend, Connect};
use terang_config::DEFAULT_SESSION_COOKIE;

use crate::{HttpRequest, Result};

/// What every handler needs: a way to reach the backend as the caller.
#[derive(Clone)]
pub struct AppState {
    connector: Arc<dyn Connect>,
    cookie_name: String,
}

impl AppState {
    pub fn new(connector: Arc<dyn Connect>) -> Self {
        Self {
            connector,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn connector(&self) -> Arc<dyn Connect> {
        self.connector.clone()
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn is_configured(&self) -> bool {
        self.connector.is_configured()
    }

    /// Backend handle acting as the caller of `req`.
    pub fn backend_for(&self, req: &HttpRequest) -> Result<Backend> {
        let token = req.access_token(&self.cookie_name);
        Ok(self.connector.connect(token.as_deref())?)
    }

    /// Anonymous backend handle.
    pub fn anonymous(&self) -> Result<Backend> {
        Ok(self.connector.connect(None)?)
    }
}
