// Live auth state for one client

use serde::Serialize;
use terang_backend::{Backend, User};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{AuthUser, GuardDecision, check_staff, require_auth, require_staff, resolve_user};

/// Snapshot of the session as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub loading: bool,
    pub is_staff: bool,
}

impl Default for AuthState {
    /// Still resolving.
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            is_staff: false,
        }
    }
}

impl AuthState {
    pub fn signed_out() -> Self {
        Self {
            user: None,
            loading: false,
            is_staff: false,
        }
    }

    /// Resolve profile and staff flag for `user`.
    pub async fn for_user(backend: &Backend, user: User) -> Self {
        let user = resolve_user(backend, user).await;
        let is_staff = check_staff(backend).await;
        Self {
            user: Some(user),
            loading: false,
            is_staff,
        }
    }

    /// State for the backend's current session.
    pub async fn current(backend: &Backend) -> Self {
        match backend.auth.get_session().await {
            Ok(Some(session)) => Self::for_user(backend, session.user).await,
            Ok(None) => Self::signed_out(),
            Err(e) => {
                warn!(error = %e, "could not read session");
                Self::signed_out()
            }
        }
    }
}

/// Tracks the session of a backend handle.
///
/// Resolves the initial session, then follows auth-state notifications
/// until dropped. Dropping the watcher ends the subscription.
pub struct AuthWatcher {
    state: watch::Receiver<AuthState>,
    task: JoinHandle<()>,
}

impl AuthWatcher {
    pub fn start(backend: Backend) -> Self {
        let (tx, rx) = watch::channel(AuthState::default());
        // Subscribe before resolving so no change is missed.
        let mut changes = backend.auth.on_auth_state_change();

        let task = tokio::spawn(async move {
            tx.send_replace(AuthState::current(&backend).await);

            while let Some(change) = changes.recv().await {
                debug!(event = ?change.event, "auth state change");
                let next = match change.session {
                    Some(session) => AuthState::for_user(&backend, session.user).await,
                    None => AuthState::signed_out(),
                };
                tx.send_replace(next);
            }
        });

        Self { state: rx, task }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.clone()
    }

    /// Wait until the initial session is resolved.
    pub async fn ready(&self) -> AuthState {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn require_auth(&self) -> GuardDecision {
        require_auth(&self.state.borrow())
    }

    pub fn require_staff(&self) -> GuardDecision {
        require_staff(&self.state.borrow())
    }
}

impl Drop for AuthWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
