//! Session tracking and route gating against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;
use terang_auth::*;
use terang_backend::{Auth, Failure, MemoryBackend};

async fn settle<F>(watcher: &AuthWatcher, pred: F) -> AuthState
where
    F: Fn(&AuthState) -> bool,
{
    let mut rx = watcher.subscribe();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| pred(s)))
        .await
        .expect("state did not settle")
        .expect("watcher closed")
        .clone()
}

#[tokio::test]
async fn test_watcher_follows_sign_in_and_out() {
    let memory = MemoryBackend::new();
    memory.add_user("admin@terang.id", "kopi-tubruk", Some("admin"));

    let watcher = AuthWatcher::start(memory.backend());
    let initial = watcher.ready().await;
    assert!(initial.user.is_none());
    assert_eq!(watcher.require_auth(), GuardDecision::Redirect {
        location: LOGIN_PATH.to_string(),
        alert: None,
    });

    memory
        .sign_in_with_password("admin@terang.id", "kopi-tubruk")
        .await
        .unwrap();
    let state = settle(&watcher, |s| s.user.is_some()).await;
    assert!(state.is_staff);
    assert_eq!(state.user.unwrap().profile.unwrap().role, Role::Admin);
    assert!(watcher.require_staff().is_allowed());

    memory.sign_out().await.unwrap();
    let state = settle(&watcher, |s| s.user.is_none()).await;
    assert!(!state.is_staff);
}

#[tokio::test]
async fn test_watcher_existing_session_without_profile() {
    let memory = MemoryBackend::new();
    memory.add_user("tamu@terang.id", "pw", None);
    memory.sign_in_with_password("tamu@terang.id", "pw").await.unwrap();

    let watcher = AuthWatcher::start(memory.backend());
    let state = watcher.ready().await;
    let user = state.user.clone().unwrap();
    assert!(user.profile.is_none());
    assert!(!state.is_staff);
    assert_eq!(watcher.require_staff(), GuardDecision::Redirect {
        location: "/".to_string(),
        alert: Some(ACCESS_DENIED.to_string()),
    });
}

#[tokio::test]
async fn test_dropping_watcher_unsubscribes() {
    let memory = MemoryBackend::new();
    let watcher = AuthWatcher::start(memory.backend());
    watcher.ready().await;

    drop(watcher);
    tokio::task::yield_now().await;
    // Emitting with no live subscription must not fail.
    memory.notify(terang_backend::AuthEvent::UserUpdated);
}

#[tokio::test]
async fn test_current_profile_requires_user() {
    let memory = MemoryBackend::new();
    let err = current_profile(&memory.backend()).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized));
    assert_eq!(err.to_string(), "Not authenticated");
}

fn gate(memory: &MemoryBackend) -> AdminGate {
    AdminGate::new(Arc::new(memory.clone()))
}

#[tokio::test]
async fn test_gate_redirects() {
    let memory = MemoryBackend::new();
    let staff = memory.add_user("editor@terang.id", "pw", Some("editor"));
    let visitor = memory.add_user("viewer@terang.id", "pw", Some("viewer"));
    let staff_token = memory.issue_token(&staff);
    let visitor_token = memory.issue_token(&visitor);
    let gate = gate(&memory);

    assert_eq!(gate.check("/books", None).await, GateDecision::Pass);
    assert_eq!(
        gate.check("/admin", None).await,
        GateDecision::Redirect("/admin/login".into())
    );
    assert_eq!(gate.check("/admin/login", None).await, GateDecision::Pass);
    assert_eq!(
        gate.check("/admin/books", Some(&visitor_token)).await,
        GateDecision::Redirect("/?error=unauthorized".into())
    );
    assert_eq!(
        gate.check("/admin/books", Some(&staff_token)).await,
        GateDecision::Pass
    );
    assert_eq!(
        gate.check("/admin/login", Some(&staff_token)).await,
        GateDecision::Redirect("/admin".into())
    );
    assert_eq!(
        gate.check("/admin/logo.png", None).await,
        GateDecision::Pass
    );
}

#[tokio::test]
async fn test_gate_staff_check_failure() {
    let memory = MemoryBackend::new();
    let staff = memory.add_user("admin@terang.id", "pw", Some("admin"));
    let token = memory.issue_token(&staff);
    let gate = gate(&memory);

    memory.fail("rpc:is_staff", Failure::Offline);
    assert_eq!(
        gate.check("/admin", Some(&token)).await,
        GateDecision::Redirect(AUTH_ERROR_REDIRECT.into())
    );

    memory.fail("rpc:is_staff", Failure::Api("permission denied".into()));
    assert_eq!(
        gate.check("/admin", Some(&token)).await,
        GateDecision::Redirect(UNAUTHORIZED_REDIRECT.into())
    );
}
