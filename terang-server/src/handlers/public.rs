// Public catalog endpoints

use chrono::Utc;
use terang_catalog::{
    ALL_CATEGORIES, Bean, Book, Entity, Event, MenuItem, Visibility, categories, fetch_all,
    fetch_visible, menu_sections, partition_upcoming, search_books, search_events,
};

use super::{bind, listing, not_found};
use crate::{AppState, HttpRequest, HttpResponse, Result, Router};

pub fn register(router: &mut Router, state: &AppState) {
    router
        .get("/health", bind(state, health))
        .get("/api/books", bind(state, books))
        .get("/api/books/categories", bind(state, book_categories))
        .get("/api/books/{id}", bind(state, detail::<Book>))
        .get("/api/events", bind(state, events))
        .get("/api/events/{id}", bind(state, detail::<Event>))
        .get("/api/menu", bind(state, menu))
        .get("/api/menu/{id}", bind(state, detail::<MenuItem>))
        .get("/api/beans", bind(state, list::<Bean>))
        .get("/api/beans/{id}", bind(state, detail::<Bean>));
}

async fn health(state: AppState, _req: HttpRequest) -> Result<HttpResponse> {
    HttpResponse::ok().with_json(&serde_json::json!({
        "status": "ok",
        "backend_configured": state.is_configured(),
    }))
}

async fn published<E: Entity>(state: &AppState, req: &HttpRequest) -> Result<Vec<E>> {
    let backend = state.backend_for(req)?;
    Ok(fetch_all::<E>(backend.db.as_ref(), Visibility::Public).await?)
}

async fn list<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    listing(published::<E>(&state, &req).await?)
}

/// A published record. Hidden records are reported as missing.
async fn detail<E: Entity>(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let id = req.require_param("id")?;
    let backend = state.backend_for(&req)?;
    let record = fetch_visible::<E>(backend.db.as_ref(), id)
        .await
        .map_err(not_found::<E>(id))?;
    HttpResponse::ok().with_json(&record)
}

/// `?q=` searches title, author and category; `?category=` filters.
async fn books(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let books = published::<Book>(&state, &req).await?;
    let query = req.query("q").map(String::as_str).unwrap_or_default();
    let category = req
        .query("category")
        .map(String::as_str)
        .unwrap_or(ALL_CATEGORIES);
    listing(search_books(&books, query, category))
}

async fn book_categories(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let books = published::<Book>(&state, &req).await?;
    HttpResponse::ok().with_json(&categories(&books))
}

/// `?q=` searches title and location. `?when=upcoming` or `?when=past`
/// keeps one side of the upcoming split.
async fn events(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let events = published::<Event>(&state, &req).await?;
    let query = req.query("q").map(String::as_str).unwrap_or_default();
    let found = search_events(&events, query);

    let found = match req.query("when").map(String::as_str) {
        Some("upcoming") => partition_upcoming(found, Utc::now()).0,
        Some("past") => partition_upcoming(found, Utc::now()).1,
        _ => found,
    };
    listing(found)
}

/// Menu items grouped into sections.
async fn menu(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let items = published::<MenuItem>(&state, &req).await?;
    HttpResponse::ok().with_json(&menu_sections(&items))
}
