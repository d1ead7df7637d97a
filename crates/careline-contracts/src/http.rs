//! Transport-neutral request/response types.
//!
//! The session manager and services build `ApiRequest`s; a `Transport`
//! implementation turns them into real HTTP calls and hands back an
//! `ApiResponse` for every status code. Only connectivity failures are
//! errors at the transport level.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CarelineError, CarelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        };
        f.write_str(s)
    }
}

/// Unique identifier for one logical request, carried across its retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outgoing API call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub id: RequestId,
    pub method: HttpMethod,
    /// Path beginning with `/`, e.g. `/api/surgeries/pending-consent`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Bearer token to send as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
    /// Set once the request has been through a refresh-and-retry cycle.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Attach a JSON body.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> CarelineResult<Self> {
        let value = serde_json::to_value(body).map_err(|e| CarelineError::Decode {
            reason: format!("failed to encode request body: {}", e),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// 401 or 403.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Deserialize the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> CarelineResult<T> {
        serde_json::from_str(&self.body).map_err(|e| CarelineError::Decode {
            reason: format!("status {}: {}", self.status, e),
        })
    }

    /// Best-effort human message from an error body.
    ///
    /// Looks at `message`, then `error`, then `detail` in a JSON body, then
    /// falls back to a short plain-text body. Returns `None` when nothing
    /// usable is present.
    pub fn error_message(&self) -> Option<String> {
        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return ["message", "error", "detail"]
                .iter()
                .filter_map(|key| value.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string);
        }
        // Plain text bodies (proxies, servlet containers) are surfaced when short.
        if trimmed.len() <= 200 && !trimmed.starts_with('<') {
            return Some(trimmed.to_string());
        }
        None
    }

    /// Classify the response: success passes through, failures become the
    /// matching `CarelineError` variant.
    pub fn into_result(self) -> CarelineResult<ApiResponse> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self
            .error_message()
            .unwrap_or_else(|| format!("request failed with status {}", self.status));
        if self.is_auth_failure() {
            Err(CarelineError::Auth {
                status: self.status,
                message,
            })
        } else {
            Err(CarelineError::Server {
                status: self.status,
                message,
            })
        }
    }
}
