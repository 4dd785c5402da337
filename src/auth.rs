//! Authentication seam.
//!
//! Sign-in itself happens elsewhere; the roster only needs to know whether a
//! user is present, which role they have, and how to sign them out. Views ask
//! [`guard`] what to do before rendering anything protected.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::RwLock};
use tracing::info;

/// Where unauthenticated visitors are sent.
pub const AUTH_ENTRY_PATH: &str = "/auth";

/// Role attached to a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Academy administrator
    Admin,
    /// Instructor
    Professor,
    /// Any other role
    #[serde(other)]
    Other,
}

impl Role {
    /// Badge label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Professor => "Professor",
            Self::Other => "Usuário",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    /// Unknown role names map to [`Role::Other`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "admin" => Self::Admin,
            "professor" => Self::Professor,
            _ => Self::Other,
        })
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Identity provider's user id
    pub id: String,
    /// Login e-mail
    pub email: Option<String>,
}

/// Snapshot of the authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    /// Present once signed in
    pub current_user: Option<AuthUser>,
    /// Role, when it has been resolved
    pub role: Option<Role>,
    /// True while the session is being restored
    pub loading: bool,
}

impl AuthState {
    /// Label for the user badge, `None` when nobody is signed in.
    #[must_use]
    pub fn badge_label(&self) -> Option<&'static str> {
        self.current_user
            .as_ref()
            .map(|_| self.role.unwrap_or(Role::Other).label())
    }
}

/// Source of the authentication state.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current state.
    fn state(&self) -> AuthState;

    /// Ends the session.
    async fn sign_out(&self) -> Result<()>;
}

/// What a protected view should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; show a spinner
    Waiting,
    /// Nobody signed in; navigate to the path, replacing history
    Redirect(&'static str),
    /// Render the protected content
    Render,
}

/// Decides how a protected view reacts to `state`.
#[must_use]
pub const fn guard(state: &AuthState) -> GuardDecision {
    if state.loading {
        GuardDecision::Waiting
    } else if state.current_user.is_none() {
        GuardDecision::Redirect(AUTH_ENTRY_PATH)
    } else {
        GuardDecision::Render
    }
}

/// Provider holding a fixed session, for local runs and tests.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    state: RwLock<AuthState>,
}

impl StaticAuthProvider {
    /// Provider with `user` signed in as `role`.
    #[must_use]
    pub fn signed_in(user: AuthUser, role: Role) -> Self {
        Self {
            state: RwLock::new(AuthState {
                current_user: Some(user),
                role: Some(role),
                loading: false,
            }),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    fn state(&self) -> AuthState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    async fn sign_out(&self) -> Result<()> {
        if let Ok(mut state) = self.state.write() {
            if let Some(user) = state.current_user.take() {
                info!("Signed out {}", user.id);
            }
            state.role = None;
        }
        Ok(())
    }
}
