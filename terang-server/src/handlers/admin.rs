// Admin dashboard and catalog management endpoints
//
// Everything here sits behind the admin gate, so handlers can assume a
// signed-in staff caller.

use terang_auth::{ADMIN_API_PREFIX, ADMIN_HOME, AuthState, LOGIN_PATH};
use terang_catalog::{
    Bean, Book, CatalogError, DashboardCounts, Entity, Event, MenuItem, Validate, Visibility,
    create, delete, fetch_all, fetch_one, update,
};
use tracing::info;

use super::{bind, listing, not_found};
use crate::{AppState, HttpRequest, HttpResponse, Result, Router};

pub fn register(router: &mut Router, state: &AppState) {
    router
        .get(ADMIN_HOME, bind(state, home))
        .get(LOGIN_PATH, bind(state, login_page))
        .get(&format!("{}dashboard", ADMIN_API_PREFIX), bind(state, dashboard));

    entity_routes::<Book>(router, state, "books");
    entity_routes::<Event>(router, state, "events");
    entity_routes::<MenuItem>(router, state, "menu");
    entity_routes::<Bean>(router, state, "beans");
}

/// Collection and member routes for one entity under the admin API.
fn entity_routes<E: Entity>(router: &mut Router, state: &AppState, segment: &str) {
    let collection = format!("{}{}", ADMIN_API_PREFIX, segment);
    let member = format!("{}/{{id}}", collection);

    router
        .get(&collection, bind(state, list::<E>))
        .post(&collection, bind(state, create_record::<E>))
        .get(&member, bind(state, show::<E>))
        .patch(&member, bind(state, update_record::<E>))
        .delete(&member, bind(state, delete_record::<E>));
}

/// Signed-in staff member and the dashboard tabs.
async fn home(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let backend = state.backend_for(&req)?;
    let auth = AuthState::current(&backend).await;
    let counts = DashboardCounts::load(backend.db.as_ref()).await?;

    HttpResponse::ok().with_json(&serde_json::json!({
        "user": auth.user,
        "tabs": counts.tabs(),
    }))
}

/// Only reached while signed out; staff are sent to the dashboard.
async fn login_page(_state: AppState, _req: HttpRequest) -> Result<HttpResponse> {
    HttpResponse::ok().with_json(&serde_json::json!({
        "authenticated": false,
        "login": "/api/auth/login",
    }))
}

async fn dashboard(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let backend = state.backend_for(&req)?;
    let counts = DashboardCounts::load(backend.db.as_ref()).await?;

    HttpResponse::ok().with_json(&serde_json::json!({
        "counts": counts,
        "tabs": counts.tabs(),
    }))
}

async fn list<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let backend = state.backend_for(&req)?;
    listing(fetch_all::<E>(backend.db.as_ref(), Visibility::Admin).await?)
}

async fn show<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let id = req.require_param("id")?;
    let backend = state.backend_for(&req)?;
    let record = fetch_one::<E>(backend.db.as_ref(), id)
        .await
        .map_err(not_found::<E>(id))?;
    HttpResponse::ok().with_json(&record)
}

/// Rejected forms answer 422 and never reach the backend.
async fn create_record<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let input: E::Input = req.json()?;
    input.validate().map_err(CatalogError::from)?;

    let backend = state.backend_for(&req)?;
    let record = create::<E>(backend.db.as_ref(), &input).await?;
    info!(table = E::TABLE, id = record.id(), "record created");
    HttpResponse::created().with_json(&record)
}

async fn update_record<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let id = req.require_param("id")?;
    let patch: E::Patch = req.json()?;
    patch.validate().map_err(CatalogError::from)?;

    let backend = state.backend_for(&req)?;
    let record = update::<E>(backend.db.as_ref(), id, &patch)
        .await
        .map_err(not_found::<E>(id))?;
    info!(table = E::TABLE, %id, "record updated");
    HttpResponse::ok().with_json(&record)
}

async fn delete_record<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let id = req.require_param("id")?;
    let backend = state.backend_for(&req)?;
    delete::<E>(backend.db.as_ref(), id).await?;
    info!(table = E::TABLE, %id, "record deleted");
    Ok(HttpResponse::no_content())
}
