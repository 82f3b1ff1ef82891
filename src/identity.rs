//! Caller identity and role resolution.

use crate::config::IdentitySettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Display name used when the host environment does not provide one.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Access level for the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every user's rows, including session ids.
    Admin,
    /// Sees only their own rows, without session ids.
    #[default]
    Standard,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Standard => write!(f, "standard"),
        }
    }
}

/// A resolved caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_name: String,
    pub role: Role,
}

/// Normalize a display name, falling back to [`UNKNOWN_USER`].
pub fn user_name_or_unknown(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_USER.to_string(),
    }
}

/// Read the user's display name from the configured environment variable.
pub fn user_name_from_env(settings: &IdentitySettings) -> String {
    user_name_or_unknown(std::env::var(&settings.user_env).ok().as_deref())
}

/// Decides which role a user has.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve(&self, user_name: &str) -> Result<Role>;
}

/// Grants admin to the user names listed in the configuration.
pub struct ConfigRoleResolver {
    admins: HashSet<String>,
}

impl ConfigRoleResolver {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_settings(settings: &IdentitySettings) -> Self {
        Self::new(settings.admin_users.iter().cloned())
    }
}

#[async_trait]
impl RoleResolver for ConfigRoleResolver {
    async fn resolve(&self, user_name: &str) -> Result<Role> {
        // The placeholder name is shared by every anonymous caller.
        if user_name != UNKNOWN_USER && self.admins.contains(user_name) {
            Ok(Role::Admin)
        } else {
            Ok(Role::Standard)
        }
    }
}

/// Resolve a caller's identity. Resolution failures fall back to [`Role::Standard`].
pub async fn resolve_identity(resolver: &dyn RoleResolver, user_name: &str) -> Identity {
    let role = match resolver.resolve(user_name).await {
        Ok(role) => role,
        Err(e) => {
            warn!("Role resolution for {} failed, using standard role: {}", user_name, e);
            Role::Standard
        }
    };

    Identity {
        user_name: user_name.to_string(),
        role,
    }
}
