//! Error taxonomy for the Careline client.
//!
//! Every fallible operation returns `CarelineResult<T>`. HTTP error bodies
//! are decoded into these variants once, at the service boundary
//! (`ApiResponse::into_result`), so callers match on variants instead of
//! probing response shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What kind of connectivity failure a `Network` error represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkFailure {
    /// The backend could not be reached (DNS, refused connection, TLS).
    Connect,
    /// The request exceeded the configured timeout budget.
    Timeout,
    /// Any other transport-level failure.
    Other,
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NetworkFailure::Connect => "connect",
            NetworkFailure::Timeout => "timeout",
            NetworkFailure::Other => "transport",
        };
        f.write_str(label)
    }
}

/// The unified error type for the Careline client.
#[derive(Debug, Error)]
pub enum CarelineError {
    /// A required field is missing or blank. Raised locally; nothing is sent.
    #[error("validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// The backend rejected the supplied username/password.
    #[error("invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// An authenticated call was rejected after the one-shot refresh cycle.
    #[error("authorization failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// The session could not be refreshed and has been torn down.
    ///
    /// The caller must send the user back to the login entry point.
    #[error("session expired: {reason}")]
    SessionExpired { reason: String },

    /// The backend could not be reached or the call timed out.
    #[error("network error ({kind}): {reason}")]
    Network { kind: NetworkFailure, reason: String },

    /// Any other 4xx/5xx response.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The same surgeon already reviewed this case.
    #[error("surgeon '{surgeon}' has already reviewed surgery {surgery_id}")]
    DuplicateReviewer { surgery_id: i64, surgeon: String },

    /// The operation is not valid in the current workflow phase.
    #[error("workflow error: {reason}")]
    Workflow { reason: String },

    /// A response body did not match the expected contract.
    #[error("failed to decode response: {reason}")]
    Decode { reason: String },

    /// The session store could not be read or written.
    #[error("session storage error: {reason}")]
    Storage { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl CarelineError {
    /// Shorthand for a `Validation` error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the auth family (`Auth`, `SessionExpired`, `InvalidCredentials`).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            CarelineError::Auth { .. }
                | CarelineError::SessionExpired { .. }
                | CarelineError::InvalidCredentials { .. }
        )
    }
}

/// Convenience alias used throughout the Careline crates.
pub type CarelineResult<T> = Result<T, CarelineError>;
