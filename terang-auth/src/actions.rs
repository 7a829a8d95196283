// Sign-in and sign-out with shared loading/error state

use serde::Serialize;
use std::sync::Arc;
use terang_backend::{Auth, BackendError, Session};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionState {
    pub loading: bool,
    pub error: Option<String>,
}

/// Result of a sign-in or sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ActionOutcome<T> {
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

/// Service answers keep their message; transport failures get `fallback`.
fn message_for(error: &BackendError, fallback: &str) -> String {
    if error.is_answer() {
        error.to_string()
    } else {
        fallback.to_string()
    }
}

#[derive(Clone)]
pub struct AuthActions {
    auth: Arc<dyn Auth>,
    state: Arc<watch::Sender<ActionState>>,
}

impl AuthActions {
    pub fn new(auth: Arc<dyn Auth>) -> Self {
        let (state, _) = watch::channel(ActionState::default());
        Self {
            auth,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> ActionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionState> {
        self.state.subscribe()
    }

    fn start(&self) {
        self.state.send_replace(ActionState {
            loading: true,
            error: None,
        });
    }

    fn finish(&self, error: Option<String>) {
        self.state.send_replace(ActionState {
            loading: false,
            error,
        });
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ActionOutcome<Session> {
        self.start();
        match self.auth.sign_in_with_password(email.trim(), password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "signed in");
                self.finish(None);
                ActionOutcome::ok(Some(session))
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                let message = message_for(&e, "Failed to sign in");
                self.finish(Some(message.clone()));
                ActionOutcome::failed(message)
            }
        }
    }

    pub async fn sign_out(&self) -> ActionOutcome<()> {
        self.start();
        match self.auth.sign_out().await {
            Ok(()) => {
                self.finish(None);
                ActionOutcome::ok(None)
            }
            Err(e) => {
                warn!(error = %e, "sign-out failed");
                let message = message_for(&e, "Failed to sign out");
                self.finish(Some(message.clone()));
                ActionOutcome::failed(message)
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terang_backend::{Failure, MemoryBackend};

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let memory = MemoryBackend::new();
        memory.add_user("kasir@terang.id", "benar", Some("viewer"));
        let actions = AuthActions::new(memory.backend().auth);

        let outcome = actions.sign_in("kasir@terang.id", "salah").await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Invalid login credentials"));
        assert_eq!(actions.state().error.as_deref(), Some("Invalid login credentials"));

        actions.clear_error();
        assert_eq!(actions.state(), ActionState::default());
    }

    #[tokio::test]
    async fn test_transport_failure_message() {
        let memory = MemoryBackend::new();
        memory.fail("auth", Failure::Offline);
        let actions = AuthActions::new(memory.backend().auth);

        let outcome = actions.sign_in("a@b.c", "x").await;
        assert_eq!(outcome.error.as_deref(), Some("Failed to sign in"));
        let outcome = actions.sign_out().await;
        assert_eq!(outcome.error.as_deref(), Some("Failed to sign out"));
        assert!(!actions.state().loading);
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let memory = MemoryBackend::new();
        memory.add_user("admin@terang.id", "kopi", Some("admin"));
        let actions = AuthActions::new(memory.backend().auth);

        let outcome = actions.sign_in(" admin@terang.id ", "kopi").await;
        assert!(outcome.success);
        assert!(outcome.data.unwrap().access_token.starts_with("mem-"));

        assert!(actions.sign_out().await.success);
    }
}
