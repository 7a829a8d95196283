//! Catalog of Toko Buku & Kopi Terang.
//!
//! Four entities (books, events, menu items, beans) share one shape: a
//! table with a public visibility flag and a fixed order, an insert input
//! and a partial patch. On top of the [`Entity`] contract this crate
//! provides:
//!
//! - [`ListResource`] and [`ItemResource`]: live state for listings and
//!   single records.
//! - [`Mutations`]: create, update and delete with shared loading/error.
//! - [`Validate`]: admin form checks with the alert shown to staff.
//! - Listing helpers for the public pages and [`DashboardCounts`].
//!
//! # Example
//!
//! ```no_run
//! use terang_backend::MemoryBackend;
//! use terang_catalog::{Book, ListResource, Visibility};
//!
//! # async fn example() {
//! let backend = MemoryBackend::new().backend();
//! let books = ListResource::<Book>::load(backend.db, Visibility::Public).await;
//! let state = books.state();
//! println!("{} books, error: {:?}", state.count, state.error);
//! # }
//! ```

mod bean;
mod book;
mod dashboard;
mod entity;
mod error;
mod event;
mod forms;
mod menu;
mod mutation;
mod resource;

pub use bean::{BEAN_ALERT, Bean, BeanInput, BeanPatch, RoastLevel};
pub use book::{ALL_CATEGORIES, BOOK_ALERT, Book, BookInput, BookPatch, categories, search_books};
pub use dashboard::{DashboardCounts, DashboardTab};
pub use entity::{
    Entity, Visibility, count, create, delete, fetch_all, fetch_one, fetch_visible, list_query,
    update,
};
pub use error::{CatalogError, Result};
pub use event::{
    EVENT_ALERT, Event, EventInput, EventPatch, EventStatus, partition_upcoming, search_events,
};
pub use forms::{Validate, ValidationError, ValidationErrors};
pub use menu::{MENU_ALERT, MenuGroup, MenuItem, MenuItemInput, MenuItemPatch, MenuSection, menu_sections};
pub use mutation::{MutationOutcome, MutationState, Mutations};
pub use resource::{ItemResource, ItemState, ListResource, ListState};
