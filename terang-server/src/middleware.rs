// Middleware system for request/response processing

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use terang_auth::{
    ACCESS_DENIED, ADMIN_API_PREFIX, AUTH_ERROR_REDIRECT, AdminGate, GateDecision, Guard,
    LOGIN_PATH,
};
use tracing::{debug, info, trace, warn};

use crate::{HttpRequest, HttpResponse, Result};

/// Boxed future of a handler or middleware step.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send>>;

/// Type alias for the next handler in the middleware chain
pub type Next = Box<dyn FnOnce(HttpRequest) -> HandlerFuture + Send>;

/// Type alias for handler functions
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Middleware trait for processing requests before they reach the handler
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass to next middleware
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse>;
}

/// Middleware chain executor
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Arc::new(Vec::new()),
        }
    }

    /// Add a middleware to the chain. Earlier middleware runs first.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        let mut mws = (*self.middlewares).clone();
        mws.push(Arc::new(middleware));
        self.middlewares = Arc::new(mws);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(&self, req: HttpRequest, handler: HandlerFn) -> Result<HttpResponse> {
        trace!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(&self, index: usize, req: HttpRequest, handler: HandlerFn) -> HandlerFuture {
        if index >= self.middlewares.len() {
            handler(req)
        } else {
            let middleware = self.middlewares[index].clone();
            let chain = self.clone();
            let handler_clone = handler.clone();

            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        Box::new(move |req| chain.execute_from(index + 1, req, handler_clone)),
                    )
                    .await
            })
        }
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every request with its status and duration.
pub struct LoggerMiddleware;

#[async_trait]
impl Middleware for LoggerMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        let start = Instant::now();
        let method = req.method.clone();
        let path = req.path.clone();
        let request_id = req.header("x-request-id").unwrap_or_default().to_string();

        debug!(%method, %path, body_bytes = req.body.len(), "request");
        let result = next(req).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                info!(%method, %path, %request_id, status = response.status, elapsed_ms, "response")
            }
            Err(e) => warn!(
                %method,
                %path,
                %request_id,
                status = e.status_code(),
                error = %e,
                elapsed_ms,
                "request failed"
            ),
        }
        result
    }
}

/// Request ID middleware
pub struct RequestIdMiddleware;

#[async_trait]
impl Middleware for RequestIdMiddleware {
    async fn handle(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse> {
        let request_id = req
            .headers
            .get("x-request-id")
            .cloned()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        req.headers
            .insert("x-request-id".to_string(), request_id.clone());

        let response = match next(req).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };
        Ok(response.with_header("x-request-id", request_id))
    }
}

/// Runs the admin gate before any `/admin` route.
///
/// Page routes get the gate's redirect. JSON endpoints under
/// [`ADMIN_API_PREFIX`] get a status instead: 401 when signed out, 403 for
/// non-staff, 502 when the role check could not be made.
pub struct AdminGateMiddleware {
    gate: AdminGate,
    cookie_name: String,
}

impl AdminGateMiddleware {
    pub fn new(gate: AdminGate, cookie_name: impl Into<String>) -> Self {
        Self {
            gate,
            cookie_name: cookie_name.into(),
        }
    }

    fn api_refusal(location: &str) -> HttpResponse {
        let (status, message) = if location == LOGIN_PATH {
            (401, "Not authenticated")
        } else if location == AUTH_ERROR_REDIRECT {
            (502, "Failed to verify access")
        } else {
            (403, ACCESS_DENIED)
        };
        HttpResponse::json_value(
            status,
            &serde_json::json!({ "error": message, "status": status }),
        )
    }
}

#[async_trait]
impl Middleware for AdminGateMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        if !AdminGate::applies_to(&req.path) {
            return next(req).await;
        }

        let token = req.access_token(&self.cookie_name);
        match self.gate.check(&req.path, token.as_deref()).await {
            GateDecision::Pass => next(req).await,
            GateDecision::Redirect(location) => {
                debug!(path = %req.path, %location, "admin gate refused");
                if req.path.starts_with(ADMIN_API_PREFIX) {
                    Ok(Self::api_refusal(&location))
                } else {
                    Ok(HttpResponse::redirect(&location))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag(&'static str);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
            let response = next(req).await?;
            let trail = response.header("x-trail").unwrap_or_default().to_string();
            Ok(response.with_header("x-trail", format!("{}{}", trail, self.0)))
        }
    }

    fn handler() -> HandlerFn {
        Arc::new(|_req: HttpRequest| Box::pin(async { Ok(HttpResponse::ok()) }) as HandlerFuture)
    }

    #[tokio::test]
    async fn test_chain_order() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(Tag("a"));
        chain.use_middleware(Tag("b"));
        let response = chain.apply(HttpRequest::new("GET", "/"), handler()).await.unwrap();
        assert_eq!(response.header("x-trail"), Some("ba"));
    }

    #[tokio::test]
    async fn test_request_id_is_kept() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(RequestIdMiddleware);
        let req = HttpRequest::new("GET", "/").with_header("X-Request-Id", "req-1");
        let response = chain.apply(req, handler()).await.unwrap();
        assert_eq!(response.header("x-request-id"), Some("req-1"));
    }

    #[test]
    fn test_api_refusals() {
        assert_eq!(AdminGateMiddleware::api_refusal(LOGIN_PATH).status, 401);
        assert_eq!(AdminGateMiddleware::api_refusal("/?error=unauthorized").status, 403);
        assert_eq!(AdminGateMiddleware::api_refusal(AUTH_ERROR_REDIRECT).status, 502);
    }
}
