//! Session, identity, and auth wire types.
//!
//! A `Session` is the client-held token pair plus the signed-in user. It is
//! created on login/signup, mutated on refresh, and destroyed on logout or an
//! unrecoverable refresh failure.

use serde::{Deserialize, Serialize};

/// The signed-in user as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Client-held authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    /// An anonymous session: no tokens, no user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build an authenticated session from a sign-in/sign-up response.
    pub fn from_tokens(tokens: AuthTokens) -> Self {
        Self {
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
            user: tokens.user,
        }
    }

    /// A present access token means the session is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Apply a refresh response. A missing refresh token keeps the old one.
    pub fn apply_refresh(&mut self, refreshed: RefreshedTokens) {
        self.access_token = Some(refreshed.access_token);
        if let Some(refresh_token) = refreshed.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
    }
}

/// Observable lifecycle phase of the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
    /// Transient: a refresh call is in flight.
    Refreshing,
}

/// `POST /auth/signin` body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `POST /auth/signup` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Response body of sign-in and sign-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// `POST /auth/refresh` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response body of `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}
