// Application bootstrapper and HTTP server

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use terang_auth::AdminGate;
use terang_storage::MAX_BODY_SIZE;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::{
    AdminGateMiddleware, AppState, HandlerFn, HandlerFuture, HttpRequest, HttpResponse,
    LoggerMiddleware, MiddlewareChain, RequestIdMiddleware, Result, Router, ServerError, handlers,
};

/// How long open connections get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The site: routes, middleware and shared state.
pub struct Application {
    router: Arc<Router>,
    chain: MiddlewareChain,
    state: AppState,
}

impl Application {
    /// Register every route and the middleware chain.
    pub fn new(state: AppState) -> Result<Self> {
        let mut router = Router::new();
        handlers::register(&mut router, &state);
        let router = router.build()?;

        let mut chain = MiddlewareChain::new();
        chain.use_middleware(RequestIdMiddleware);
        chain.use_middleware(LoggerMiddleware);
        chain.use_middleware(AdminGateMiddleware::new(
            AdminGate::new(state.connector()),
            state.cookie_name(),
        ));

        Ok(Self {
            router: Arc::new(router),
            chain,
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run one request through middleware and routing. Errors become JSON
    /// error responses.
    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let router = self.router.clone();
        let handler: HandlerFn = Arc::new(move |req: HttpRequest| {
            let router = router.clone();
            Box::pin(async move { router.dispatch(req).await }) as HandlerFuture
        });

        match self.chain.apply(req, handler).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    }

    /// Bind `addr` and serve until Ctrl-C or SIGTERM.
    pub async fn listen(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "server listening");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `shutdown` resolves, then
    /// let open connections drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let app = Arc::new(self);
        let graceful = GracefulShutdown::new();
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    debug!(%peer, "connection accepted");

                    let app = app.clone();
                    let service = service_fn(move |req: Request<IncomingBody>| {
                        let app = app.clone();
                        async move { handle_request(req, app).await }
                    });
                    let connection = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service);
                    let connection = graceful.watch(connection);

                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            debug!(error = %e, "connection closed with error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
            }
        }

        drop(listener);
        tokio::select! {
            _ = graceful.shutdown() => info!("all connections closed"),
            _ = tokio::time::sleep(DRAIN_TIMEOUT) => {
                warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "connections still open after drain timeout")
            }
        }
        Ok(())
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    app: Arc<Application>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let response = match into_request(req).await {
        Ok(request) => app.handle(request).await,
        Err(e) => e.into_response(),
    };
    Ok(into_hyper(response))
}

async fn into_request(req: Request<IncomingBody>) -> Result<HttpRequest> {
    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let mut request = HttpRequest::new(parts.method.as_str(), path);
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let body = Limited::new(body, MAX_BODY_SIZE as usize)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                ServerError::PayloadTooLarge(MAX_BODY_SIZE)
            } else {
                ServerError::BadRequest(format!("could not read body: {}", e))
            }
        })?;
    Ok(request.with_body(body.to_bytes()))
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|e| {
            error!(error = %e, "invalid response");
            let mut fallback = Response::new(Full::new(Bytes::from_static(
                b"{\"error\":\"Internal server error\",\"status\":500}",
            )));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C"),
            Err(e) => {
                warn!(error = %e, "could not listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM");
            }
            Err(e) => {
                warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terang_backend::MemoryBackend;

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let app = Application::new(AppState::new(Arc::new(MemoryBackend::new()))).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(app.serve(listener, async {
            let _ = stopped.await;
        }));

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (mut sender, connection) =
            hyper::client::conn::http1::handshake(TokioIo::new(stream)).await.unwrap();
        tokio::spawn(connection);

        let request = Request::get("/health")
            .header("host", addr.to_string())
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = sender.send_request(request).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().contains_key("x-request-id"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "ok");
        drop(sender);

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test]
    fn test_invalid_header_falls_back_to_500() {
        let response = HttpResponse::ok().with_header("bad header", "x");
        assert_eq!(into_hyper(response).status(), 500);
    }
}
