// Staff authentication for Terang
//
// Resolves who is signed in, whether they are staff, and what a protected
// view or route should do about it.

pub mod actions;
pub mod error;
pub mod guard;
pub mod user;
pub mod watcher;

pub use actions::{ActionOutcome, ActionState, AuthActions};
pub use error::{AuthError, Result};
pub use guard::{
    ACCESS_DENIED, ADMIN_API_PREFIX, ADMIN_HOME, ADMIN_PREFIX, AUTH_ERROR_REDIRECT, AdminGate,
    GateDecision, Guard, GuardDecision, LOGIN_PATH, UNAUTHORIZED_REDIRECT, is_static_asset,
    pathname, require_auth, require_staff,
};
pub use user::{AuthUser, Profile, Role, check_staff, current_profile, resolve_user};
pub use watcher::{AuthState, AuthWatcher};
