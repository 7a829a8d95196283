// Create, update and delete with shared loading/error state

use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use terang_backend::Database;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{CatalogError, Entity};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationState {
    pub loading: bool,
    pub error: Option<String>,
}

/// Result of one mutation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationOutcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> MutationOutcome<T> {
    fn ok(data: Option<T>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Writes for one entity. Callers refetch their listings afterwards and
/// validate inputs before calling.
pub struct Mutations<E: Entity> {
    db: Arc<dyn Database>,
    state: watch::Sender<MutationState>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Mutations<E> {
    pub fn new(db: Arc<dyn Database>) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            db,
            state,
            _entity: PhantomData,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    pub async fn create(&self, input: &E::Input) -> MutationOutcome<E> {
        self.begin();
        let result = crate::create::<E>(self.db.as_ref(), input).await;
        self.settle("create", result)
    }

    pub async fn update(&self, id: &str, patch: &E::Patch) -> MutationOutcome<E> {
        self.begin();
        let result = crate::update::<E>(self.db.as_ref(), id, patch).await;
        self.settle("update", result)
    }

    pub async fn delete(&self, id: &str) -> MutationOutcome<()> {
        self.begin();
        let result = crate::delete::<E>(self.db.as_ref(), id).await;
        match self.settle("delete", result) {
            MutationOutcome { success: true, .. } => MutationOutcome::ok(None),
            outcome => outcome,
        }
    }

    fn begin(&self) {
        self.state.send_replace(MutationState {
            loading: true,
            error: None,
        });
    }

    fn settle<T>(&self, verb: &str, result: Result<T, CatalogError>) -> MutationOutcome<T> {
        match result {
            Ok(data) => {
                info!(table = E::TABLE, action = verb, "saved");
                self.state.send_replace(MutationState::default());
                MutationOutcome::ok(Some(data))
            }
            Err(e) => {
                warn!(table = E::TABLE, action = verb, error = %e, "write failed");
                let message = e.message_or(format!("Failed to {} {}", verb, E::SINGULAR));
                self.state.send_replace(MutationState {
                    loading: false,
                    error: Some(message.clone()),
                });
                MutationOutcome::failed(message)
            }
        }
    }
}
