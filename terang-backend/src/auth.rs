//! Authentication service contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::Result;

/// A backend user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

/// Kind of auth-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Notification delivered to auth-state subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Fan-out of auth-state changes to every live subscription.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthChange>,
}

impl AuthEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let delivered = self.tx.send(AuthChange { event, session }).unwrap_or(0);
        debug!(?event, subscribers = delivered, "auth state changed");
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription to auth-state changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Wait for the next change; `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Email/password authentication.
#[async_trait]
pub trait Auth: Send + Sync {
    /// The current session, if any.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// The current user as verified by the service.
    async fn get_user(&self) -> Result<Option<User>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// End the session. The local session is cleared even if the service
    /// call fails.
    async fn sign_out(&self) -> Result<()>;

    fn on_auth_state_change(&self) -> AuthSubscription;
}
