// Sign-in, sign-out and session endpoints

use serde::Deserialize;
use terang_auth::{AuthActions, AuthState};
use tracing::info;

use super::bind;
use crate::{AppState, HttpRequest, HttpResponse, Result, Router, ServerError};

/// Cookie lifetime when the backend does not say.
const DEFAULT_SESSION_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

pub fn register(router: &mut Router, state: &AppState) {
    router
        .post("/api/auth/login", bind(state, login))
        .post("/api/auth/logout", bind(state, logout))
        .get("/api/auth/session", bind(state, session));
}

/// Sign in with email and password and hand the access token back as an
/// HTTP-only cookie.
async fn login(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let credentials: Credentials = req.json()?;
    let backend = state.anonymous()?;

    let outcome = AuthActions::new(backend.auth.clone())
        .sign_in(credentials.email.trim(), &credentials.password)
        .await;
    let session = match (outcome.data, outcome.error) {
        (Some(session), _) => session,
        (None, error) => {
            return Err(ServerError::Unauthorized(
                error.unwrap_or_else(|| "Failed to sign in".to_string()),
            ));
        }
    };

    let auth = AuthState::current(&backend).await;
    info!(user_id = %session.user.id, is_staff = auth.is_staff, "signed in");

    let max_age = session.expires_in.unwrap_or(DEFAULT_SESSION_SECS);
    Ok(HttpResponse::ok()
        .with_json(&auth)?
        .with_session_cookie(state.cookie_name(), &session.access_token, max_age))
}

/// Sign out. The cookie is cleared even when the backend call fails.
async fn logout(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let backend = state.backend_for(&req)?;
    let outcome = AuthActions::new(backend.auth.clone()).sign_out().await;

    Ok(HttpResponse::ok()
        .with_json(&serde_json::json!({
            "success": outcome.success,
            "error": outcome.error,
        }))?
        .clear_session_cookie(state.cookie_name()))
}

async fn session(state: AppState, req: HttpRequest) -> Result<HttpResponse> {
    let backend = state.backend_for(&req)?;
    HttpResponse::ok().with_json(&AuthState::current(&backend).await)
}
