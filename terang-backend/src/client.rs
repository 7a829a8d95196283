//! HTTP client shared by the REST backend services.

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{BackendError, RequestBuilder, Response, Result};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL every request path is joined to.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Headers added to every request.
    pub default_headers: HashMap<String, String>,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("terang/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

/// Thin wrapper over `reqwest::Client` with a fixed base URL.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: Arc<HttpClientConfig>,
    base: url::Url,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        // Trailing slash so that `join("rest/v1/books")` keeps any base path.
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base = url::Url::parse(&base)?;

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| BackendError::RequestBuild(e.to_string()))?;

        Ok(Self {
            inner,
            config: Arc::new(config),
            base,
        })
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Resolve a path such as `rest/v1/books` against the base URL.
    pub fn url(&self, path: &str) -> Result<url::Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::GET, path.into())
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::POST, path.into())
    }

    pub fn patch(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::PATCH, path.into())
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, Method::DELETE, path.into())
    }

    /// Execute a built request once. No retries.
    pub(crate) async fn execute(&self, request: reqwest::Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.inner.execute(request).await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                BackendError::Connection(e.to_string())
            } else {
                BackendError::Http(e)
            }
        })?;

        debug!(
            method = %method,
            path = url.path(),
            status = response.status().as_u16(),
            "backend request completed"
        );

        Response::from_reqwest(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_keeps_base_path() {
        let client = HttpClient::new(HttpClientConfig::new("https://demo.example/base")).unwrap();
        assert_eq!(
            client.url("/rest/v1/books").unwrap().as_str(),
            "https://demo.example/base/rest/v1/books"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpClient::new(HttpClientConfig::new("not a url")),
            Err(BackendError::InvalidUrl(_))
        ));
    }
}
