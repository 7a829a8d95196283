// Route handlers

pub mod admin;
pub mod auth;
pub mod public;
pub mod upload;

use serde::Serialize;
use std::future::Future;
use terang_backend::BackendError;
use terang_catalog::{CatalogError, Entity};

use crate::{AppState, HttpRequest, HttpResponse, Result, Router, ServerError};

/// Register every route of the site on `router`.
pub fn register(router: &mut Router, state: &AppState) {
    public::register(router, state);
    auth::register(router, state);
    admin::register(router, state);
    upload::register(router, state);
}

/// Close `handler` over a clone of the application state.
pub(crate) fn bind<F, Fut>(
    state: &AppState,
    handler: F,
) -> impl Fn(HttpRequest) -> Fut + Send + Sync + 'static
where
    F: Fn(AppState, HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    let state = state.clone();
    move |req| handler(state.clone(), req)
}

/// `{data, count}` body for a listing.
pub(crate) fn listing<T: Serialize>(data: Vec<T>) -> Result<HttpResponse> {
    HttpResponse::ok().with_json(&serde_json::json!({
        "count": data.len(),
        "data": data,
    }))
}

/// Turn "no such row" into a 404 naming the entity.
pub(crate) fn not_found<E: Entity>(id: &str) -> impl FnOnce(CatalogError) -> ServerError + '_ {
    move |error| match error {
        CatalogError::Backend(BackendError::NotFound(_)) => {
            ServerError::NotFound(format!("{} {}", E::SINGULAR, id))
        }
        other => other.into(),
    }
}
