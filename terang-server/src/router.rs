// Routing system for HTTP requests

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

use crate::{HandlerFn, HandlerFuture, HttpRequest, HttpResponse, Result, ServerError};

/// Method-keyed handlers for one path pattern.
#[derive(Default)]
struct Endpoint {
    handlers: HashMap<String, HandlerFn>,
}

/// Path router backed by `matchit`. Patterns use `{name}` parameters.
#[derive(Default)]
pub struct Router {
    inner: matchit::Router<Endpoint>,
    patterns: Vec<String>,
    pending: HashMap<String, Endpoint>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` on `pattern`.
    pub fn route<F, Fut>(&mut self, method: &str, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        let handler: HandlerFn =
            Arc::new(move |req: HttpRequest| Box::pin(handler(req)) as HandlerFuture);
        if !self.pending.contains_key(pattern) {
            self.patterns.push(pattern.to_string());
        }
        self.pending
            .entry(pattern.to_string())
            .or_default()
            .handlers
            .insert(method.to_ascii_uppercase(), handler);
        self
    }

    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route("GET", pattern, handler)
    }

    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route("POST", pattern, handler)
    }

    pub fn patch<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route("PATCH", pattern, handler)
    }

    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route("DELETE", pattern, handler)
    }

    /// Compile registered routes. Fails on conflicting patterns.
    pub fn build(mut self) -> Result<Self> {
        for pattern in std::mem::take(&mut self.patterns) {
            if let Some(endpoint) = self.pending.remove(&pattern) {
                self.inner.insert(pattern, endpoint)?;
            }
        }
        Ok(self)
    }

    /// Find the handler for a request and fill its path and query
    /// parameters. `HEAD` falls back to `GET`.
    pub fn resolve(&self, request: &mut HttpRequest) -> Result<HandlerFn> {
        let (path, query) = match request.path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (request.path.clone(), None),
        };

        if let Some(query) = query {
            request.query_params = parse_query_string(&query);
            request.path = path.clone();
        }

        let matched = self
            .inner
            .at(&path)
            .map_err(|_| ServerError::RouteNotFound(format!("{} {}", request.method, path)))?;

        let handlers = &matched.value.handlers;
        let handler = handlers
            .get(&request.method)
            .or_else(|| {
                (request.method == "HEAD")
                    .then(|| handlers.get("GET"))
                    .flatten()
            })
            .cloned()
            .ok_or_else(|| ServerError::MethodNotAllowed(format!("{} {}", request.method, path)))?;

        request.path_params = matched
            .params
            .iter()
            .map(|(k, v)| {
                let value = urlencoding::decode(v)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| v.to_string());
                (k.to_string(), value)
            })
            .collect();

        trace!(method = %request.method, path = %path, "route matched");
        Ok(handler)
    }

    /// Resolve and run the handler.
    pub async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let handler = self.resolve(&mut request)?;
        handler(request).await
    }
}

/// Parse a query string into a map of parameters
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_router() -> Router {
        let mut router = Router::new();
        router
            .get("/api/books", |req: HttpRequest| async move {
                HttpResponse::ok().with_json(&req.query_params)
            })
            .get("/api/books/{id}", |req: HttpRequest| async move {
                HttpResponse::ok().with_json(&req.path_params)
            })
            .delete("/api/books/{id}", |_req: HttpRequest| async move {
                Ok(HttpResponse::no_content())
            });
        router.build().unwrap()
    }

    #[tokio::test]
    async fn test_params() {
        let router = echo_router();

        let res = router
            .dispatch(HttpRequest::new("GET", "/api/books?q=kopi%20gayo&category=all"))
            .await
            .unwrap();
        let query: HashMap<String, String> = res.json().unwrap();
        assert_eq!(query["q"], "kopi gayo");
        assert_eq!(query["category"], "all");

        let res = router
            .dispatch(HttpRequest::new("GET", "/api/books/abc-123"))
            .await
            .unwrap();
        let params: HashMap<String, String> = res.json().unwrap();
        assert_eq!(params["id"], "abc-123");
    }

    #[tokio::test]
    async fn test_not_found_and_method() {
        let router = echo_router();
        let err = router
            .dispatch(HttpRequest::new("GET", "/api/nothing"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = router
            .dispatch(HttpRequest::new("PATCH", "/api/books/1"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 405);

        let res = router
            .dispatch(HttpRequest::new("HEAD", "/api/books"))
            .await
            .unwrap();
        assert_eq!(res.status, 200);
    }

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("a=1&b=two+words&c=");
        assert_eq!(params["b"], "two words");
        assert_eq!(params["c"], "");
    }
}
