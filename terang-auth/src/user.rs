// Staff profiles and the resolved user

use serde::{Deserialize, Serialize};
use terang_backend::{Backend, Query, User};
use tracing::warn;

use crate::{AuthError, Result};

/// Staff role stored on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

/// Row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The signed-in user with their profile when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub profile: Option<Profile>,
}

impl AuthUser {
    pub fn from_user(user: User, profile: Option<Profile>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            profile,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    /// Check if user has a role
    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }

    /// Check if user has any of the roles
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.display_name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("Staff")
    }
}

async fn load_profile_for(backend: &Backend, user_id: &str) -> Result<Profile> {
    let row = backend
        .db
        .select_single(&Query::table("profiles").eq("id", user_id))
        .await?;
    serde_json::from_value(row).map_err(|e| AuthError::InvalidProfile(e.to_string()))
}

/// Profile of the current user; [`AuthError::Unauthorized`] when nobody
/// is signed in.
pub async fn current_profile(backend: &Backend) -> Result<Profile> {
    let user = backend
        .auth
        .get_user()
        .await?
        .ok_or(AuthError::Unauthorized)?;
    load_profile_for(backend, &user.id).await
}

/// Build the [`AuthUser`] for `user`. A missing or unreadable profile is
/// logged and left empty.
pub async fn resolve_user(backend: &Backend, user: User) -> AuthUser {
    let profile = match load_profile_for(backend, &user.id).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "profile unavailable");
            None
        }
    };
    AuthUser::from_user(user, profile)
}

/// Result of the `is_staff` check. Failures count as not staff.
pub async fn check_staff(backend: &Backend) -> bool {
    match backend.is_staff().await {
        Ok(staff) => staff,
        Err(e) => {
            warn!(error = %e, "staff check failed");
            false
        }
    }
}
