//! Live listings and single records.
//!
//! A resource owns its state and publishes snapshots through a
//! [`tokio::sync::watch`] channel. Every fetch replaces the state with the
//! outcome of that fetch; when fetches overlap the last one to resolve wins.

use serde::Serialize;
use std::sync::{Arc, Weak};
use terang_backend::Database;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{Entity, Result, Visibility, fetch_all, fetch_one};

/// Snapshot of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListState<T> {
    pub data: Vec<T>,
    pub count: usize,
    pub error: Option<String>,
    pub loading: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            count: 0,
            error: None,
            loading: true,
        }
    }
}

struct ListInner<E: Entity> {
    db: Arc<dyn Database>,
    visibility: Visibility,
    state: watch::Sender<ListState<E>>,
}

impl<E: Entity> ListInner<E> {
    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish(&self, result: Result<Vec<E>>) {
        let next = match result {
            Ok(data) => ListState {
                count: data.len(),
                data,
                error: None,
                loading: false,
            },
            Err(e) => {
                warn!(table = E::TABLE, error = %e, "fetch failed");
                ListState {
                    data: Vec::new(),
                    count: 0,
                    error: Some(e.message_or(format!("Failed to fetch {}", E::PLURAL))),
                    loading: false,
                }
            }
        };
        self.state.send_replace(next);
    }
}

/// Every row of one entity visible to a [`Visibility`].
pub struct ListResource<E: Entity> {
    inner: Arc<ListInner<E>>,
}

impl<E: Entity> Clone for ListResource<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity> ListResource<E> {
    /// A resource in its initial loading state. Nothing is fetched yet.
    pub fn new(db: Arc<dyn Database>, visibility: Visibility) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            inner: Arc::new(ListInner {
                db,
                visibility,
                state,
            }),
        }
    }

    /// Create and start the first fetch in the background.
    pub fn start(db: Arc<dyn Database>, visibility: Visibility) -> Self {
        let resource = Self::new(db, visibility);
        resource.spawn_refetch();
        resource
    }

    /// Create and wait for the first fetch.
    pub async fn load(db: Arc<dyn Database>, visibility: Visibility) -> Self {
        let resource = Self::new(db, visibility);
        resource.refetch().await;
        resource
    }

    pub fn visibility(&self) -> Visibility {
        self.inner.visibility
    }

    pub fn state(&self) -> ListState<E> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<E>> {
        self.inner.state.subscribe()
    }

    /// Run the listing query again and publish the outcome.
    pub async fn refetch(&self) {
        self.inner.begin();
        let result = fetch_all::<E>(self.inner.db.as_ref(), self.inner.visibility).await;
        self.inner.finish(result);
    }

    /// Refetch on a background task. The task holds only a weak
    /// reference, so a response arriving after the resource is dropped is
    /// discarded.
    pub fn spawn_refetch(&self) -> JoinHandle<()> {
        self.inner.begin();
        let weak: Weak<ListInner<E>> = Arc::downgrade(&self.inner);
        let db = self.inner.db.clone();
        let visibility = self.inner.visibility;

        tokio::spawn(async move {
            let result = fetch_all::<E>(db.as_ref(), visibility).await;
            match weak.upgrade() {
                Some(inner) => inner.finish(result),
                None => debug!(table = E::TABLE, "listing dropped, response discarded"),
            }
        })
    }
}

/// Snapshot of a single record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemState<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub loading: bool,
}

impl<T> Default for ItemState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
        }
    }
}

/// One record selected by id.
pub struct ItemResource<E: Entity> {
    db: Arc<dyn Database>,
    id: parking_lot::Mutex<Option<String>>,
    state: watch::Sender<ItemState<E>>,
}

impl<E: Entity> ItemResource<E> {
    pub fn new(db: Arc<dyn Database>) -> Self {
        let (state, _) = watch::channel(ItemState::default());
        Self {
            db,
            id: parking_lot::Mutex::new(None),
            state,
        }
    }

    pub fn id(&self) -> Option<String> {
        self.id.lock().clone()
    }

    pub fn state(&self) -> ItemState<E> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ItemState<E>> {
        self.state.subscribe()
    }

    /// Select a record. `None` clears the state without a request; a new
    /// id fetches it; the current id does nothing.
    pub async fn set_id(&self, id: Option<String>) {
        {
            let mut current = self.id.lock();
            if *current == id {
                return;
            }
            *current = id.clone();
        }

        match id {
            Some(id) => self.fetch(&id).await,
            None => {
                self.state.send_replace(ItemState::default());
            }
        }
    }

    /// Fetch the selected record again. No-op without an id.
    pub async fn refetch(&self) {
        if let Some(id) = self.id() {
            self.fetch(&id).await;
        }
    }

    async fn fetch(&self, id: &str) {
        self.state.send_replace(ItemState {
            data: None,
            error: None,
            loading: true,
        });

        let next = match fetch_one::<E>(self.db.as_ref(), id).await {
            Ok(item) => ItemState {
                data: Some(item),
                error: None,
                loading: false,
            },
            Err(e) => {
                warn!(table = E::TABLE, id, error = %e, "fetch failed");
                ItemState {
                    data: None,
                    error: Some(e.message_or(format!("Failed to fetch {}", E::SINGULAR))),
                    loading: false,
                }
            }
        };
        self.state.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Book, MenuItem};
    use serde_json::json;
    use terang_backend::{Failure, MemoryBackend};

    fn seed_books(memory: &MemoryBackend) {
        for (title, published) in [("Fiqh Islam", true), ("Draf", false), ("Algoritma Dasar", true)] {
            memory.seed(
                "books",
                json!({
                    "title": title,
                    "author": "Anon",
                    "category": "Umum",
                    "price": 50000,
                    "is_published": published,
                }),
            );
        }
    }

    #[tokio::test]
    async fn test_public_and_admin_listings() {
        let memory = MemoryBackend::new();
        seed_books(&memory);
        let db = memory.backend().db;

        let public = ListResource::<Book>::load(db.clone(), Visibility::Public).await;
        let state = public.state();
        assert!(!state.loading);
        assert_eq!(state.count, 2);
        assert_eq!(state.data.len(), 2);
        assert!(state.data.iter().all(|b| b.is_published));

        let admin = ListResource::<Book>::load(db, Visibility::Admin).await;
        assert_eq!(admin.state().count, 3);
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let memory = MemoryBackend::new();
        let resource = ListResource::<Book>::new(memory.backend().db, Visibility::Public);
        assert_eq!(resource.state(), ListState::default());
        assert!(resource.state().loading);
    }

    #[tokio::test]
    async fn test_backend_error_clears_data() {
        let memory = MemoryBackend::new();
        seed_books(&memory);
        let resource = ListResource::<Book>::load(memory.backend().db, Visibility::Admin).await;
        assert_eq!(resource.state().count, 3);

        memory.fail("books", Failure::Api("permission denied for table books".into()));
        resource.refetch().await;
        let state = resource.state();
        assert!(state.data.is_empty());
        assert_eq!(state.count, 0);
        assert_eq!(state.error.as_deref(), Some("permission denied for table books"));

        memory.fail("books", Failure::Offline);
        resource.refetch().await;
        assert_eq!(resource.state().error.as_deref(), Some("Failed to fetch books"));
    }

    #[tokio::test]
    async fn test_spawned_refetch_publishes() {
        let memory = MemoryBackend::new();
        memory.seed("menu_items", json!({"name": "Latte", "group": "Espresso", "price": 28000, "is_available": true, "sort_order": 1}));
        let resource = ListResource::<MenuItem>::start(memory.backend().db, Visibility::Public);

        let mut rx = resource.subscribe();
        let state = rx.wait_for(|s| !s.loading).await.unwrap().clone();
        assert_eq!(state.count, 1);
        assert_eq!(state.data[0].name, "Latte");
    }

    #[tokio::test]
    async fn test_dropped_listing_discards_response() {
        let memory = MemoryBackend::new();
        seed_books(&memory);
        let resource = ListResource::<Book>::new(memory.backend().db, Visibility::Public);
        let task = resource.spawn_refetch();
        drop(resource);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_item_resource() {
        let memory = MemoryBackend::new();
        let row = memory.seed(
            "books",
            json!({"title": "Fiqh Islam", "author": "Sayyid Sabiq", "category": "Agama", "price": 65000, "is_published": false}),
        );
        let id = row["id"].as_str().unwrap().to_string();
        let item = ItemResource::<Book>::new(memory.backend().db);

        assert_eq!(item.state(), ItemState::default());
        item.refetch().await;
        assert_eq!(item.state(), ItemState::default());

        item.set_id(Some(id.clone())).await;
        let state = item.state();
        assert_eq!(state.data.unwrap().title, "Fiqh Islam");
        assert!(!state.loading);

        item.set_id(Some("missing".into())).await;
        let state = item.state();
        assert!(state.data.is_none());
        assert!(state.error.is_some());

        memory.fail("books", Failure::Offline);
        item.refetch().await;
        assert_eq!(item.state().error.as_deref(), Some("Failed to fetch book"));

        item.set_id(None).await;
        assert_eq!(item.state(), ItemState::default());
    }
}
