// Guards for staff-only views and the admin route gate

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use terang_backend::Connect;
use tracing::{debug, error, warn};

use crate::AuthState;

/// Prefix of every protected route.
pub const ADMIN_PREFIX: &str = "/admin";
pub const ADMIN_HOME: &str = "/admin";
/// Admin JSON endpoints. Gated whatever their file extension.
pub const ADMIN_API_PREFIX: &str = "/admin/api/";
pub const LOGIN_PATH: &str = "/admin/login";
pub const UNAUTHORIZED_REDIRECT: &str = "/?error=unauthorized";
pub const AUTH_ERROR_REDIRECT: &str = "/admin/login?error=auth_error";
pub const ACCESS_DENIED: &str = "Access denied. Admin privileges required.";

static STATIC_ASSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(?:_next/static|_next/image|favicon\.ico)|\.(?:svg|png|jpg|jpeg|gif|webp)$").unwrap()
});

/// Outcome of a view guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; render nothing yet.
    Pending,
    Allow,
    Redirect {
        location: String,
        /// Message to show before navigating.
        alert: Option<String>,
    },
}

impl GuardDecision {
    fn redirect(location: &str, alert: Option<&str>) -> Self {
        Self::Redirect {
            location: location.to_string(),
            alert: alert.map(str::to_string),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Any signed-in user.
pub fn require_auth(state: &AuthState) -> GuardDecision {
    if state.loading {
        GuardDecision::Pending
    } else if state.user.is_none() {
        GuardDecision::redirect(LOGIN_PATH, None)
    } else {
        GuardDecision::Allow
    }
}

/// Signed-in staff only. Other signed-in users are sent to the public
/// site with an alert.
pub fn require_staff(state: &AuthState) -> GuardDecision {
    if state.loading {
        GuardDecision::Pending
    } else if state.user.is_none() {
        GuardDecision::redirect(LOGIN_PATH, None)
    } else if !state.is_staff {
        GuardDecision::redirect("/", Some(ACCESS_DENIED))
    } else {
        GuardDecision::Allow
    }
}

/// Decision of the route gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(String),
}

/// Request-level access check.
#[async_trait]
pub trait Guard: Send + Sync {
    async fn check(&self, path: &str, access_token: Option<&str>) -> GateDecision;
}

/// The path of a request target, without query or fragment.
pub fn pathname(target: &str) -> &str {
    match target.find(['?', '#']) {
        Some(end) => &target[..end],
        None => target,
    }
}

/// Static files and images are never gated.
pub fn is_static_asset(path: &str) -> bool {
    STATIC_ASSET.is_match(path)
}

/// Redirects visitors of `/admin` routes who are signed out or not staff.
///
/// This is defense in depth only; row-level policies in the backend
/// remain the real access control.
pub struct AdminGate {
    connector: Arc<dyn Connect>,
}

impl AdminGate {
    pub fn new(connector: Arc<dyn Connect>) -> Self {
        Self { connector }
    }

    /// Whether `target` falls under the gate at all.
    pub fn applies_to(target: &str) -> bool {
        let path = pathname(target);
        path.starts_with(ADMIN_PREFIX)
            && (path.starts_with(ADMIN_API_PREFIX) || !is_static_asset(path))
    }
}

#[async_trait]
impl Guard for AdminGate {
    async fn check(&self, target: &str, access_token: Option<&str>) -> GateDecision {
        let path = pathname(target);
        if !Self::applies_to(path) {
            return GateDecision::Pass;
        }
        if !self.connector.is_configured() {
            warn!("backend not configured, skipping admin gate");
            return GateDecision::Pass;
        }

        let backend = match self.connector.connect(access_token) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(error = %e, "backend unavailable, skipping admin gate");
                return GateDecision::Pass;
            }
        };

        let user = match backend.auth.get_user().await {
            Ok(user) => user,
            Err(e) => {
                debug!(error = %e, "user lookup failed, treating as signed out");
                None
            }
        };

        if path == LOGIN_PATH {
            return match user {
                Some(_) => GateDecision::Redirect(ADMIN_HOME.to_string()),
                None => GateDecision::Pass,
            };
        }

        let Some(user) = user else {
            return GateDecision::Redirect(LOGIN_PATH.to_string());
        };

        match backend.is_staff().await {
            Ok(true) => GateDecision::Pass,
            Ok(false) => GateDecision::Redirect(UNAUTHORIZED_REDIRECT.to_string()),
            // The service answered but refused: same as "not staff".
            Err(e) if e.is_answer() => {
                warn!(user_id = %user.id, error = %e, "staff check refused");
                GateDecision::Redirect(UNAUTHORIZED_REDIRECT.to_string())
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "staff check failed");
                GateDecision::Redirect(AUTH_ERROR_REDIRECT.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthUser;

    fn user() -> AuthUser {
        AuthUser {
            id: "u1".into(),
            email: Some("u1@terang.id".into()),
            profile: None,
        }
    }

    #[test]
    fn test_static_assets() {
        assert!(is_static_asset("/_next/static/chunk.js"));
        assert!(is_static_asset("/favicon.ico"));
        assert!(is_static_asset("/admin/logo.png"));
        assert!(!is_static_asset("/admin/api/books"));
        assert!(!AdminGate::applies_to("/books"));
        assert!(AdminGate::applies_to("/admin"));
        assert!(!AdminGate::applies_to("/admin/logo.png"));
        assert!(AdminGate::applies_to("/admin/api/upload/books/cover.png"));
        assert!(!AdminGate::applies_to("/admin/logo.png?v=2"));
        assert!(AdminGate::applies_to("/admin/login?next=cover.png"));
    }

    #[test]
    fn test_pathname_drops_query_and_fragment() {
        assert_eq!(pathname("/admin/login?error=auth_error"), "/admin/login");
        assert_eq!(pathname("/admin#books"), "/admin");
        assert_eq!(pathname("/admin/api/books"), "/admin/api/books");
    }

    #[test]
    fn test_require_staff_decisions() {
        let loading = AuthState::default();
        assert_eq!(require_staff(&loading), GuardDecision::Pending);

        let signed_out = AuthState::signed_out();
        assert_eq!(
            require_staff(&signed_out),
            GuardDecision::Redirect {
                location: "/admin/login".into(),
                alert: None
            }
        );

        let visitor = AuthState {
            user: Some(user()),
            loading: false,
            is_staff: false,
        };
        assert_eq!(
            require_staff(&visitor),
            GuardDecision::Redirect {
                location: "/".into(),
                alert: Some(ACCESS_DENIED.into())
            }
        );
        assert!(require_auth(&visitor).is_allowed());

        let staff = AuthState {
            is_staff: true,
            ..visitor
        };
        assert!(require_staff(&staff).is_allowed());
    }
}
