//! # careline-http
//!
//! Blocking HTTP `Transport` for the Careline client, built on
//! `reqwest::blocking`.
//!
//! The transport is deliberately dumb: it sends exactly one request, returns
//! every HTTP status as a response, and maps only connectivity failures to
//! `CarelineError::Network`. Token handling and the refresh-and-retry cycle
//! belong to `careline_core::SessionManager`.

use std::time::Duration;

use tracing::{debug, warn};

use careline_contracts::{
    error::{CarelineError, CarelineResult, NetworkFailure},
    http::{ApiRequest, ApiResponse, HttpMethod},
};
use careline_core::traits::Transport;

/// `Transport` over a pooled `reqwest::blocking::Client`.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport for `base_url` with a fixed per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> CarelineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CarelineError::Config {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: normalize_base_url(base_url),
            client,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn classify(&self, e: &reqwest::Error) -> CarelineError {
        if e.is_timeout() {
            CarelineError::Network {
                kind: NetworkFailure::Timeout,
                reason: format!("request timed out after {}s", self.timeout.as_secs()),
            }
        } else if e.is_connect() {
            CarelineError::Network {
                kind: NetworkFailure::Connect,
                reason: format!("could not reach {}", self.base_url),
            }
        } else {
            CarelineError::Network {
                kind: NetworkFailure::Other,
                reason: e.to_string(),
            }
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> CarelineResult<ApiResponse> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().map_err(|e| {
            let err = self.classify(&e);
            warn!(request_id = %request.id, method = %request.method, url = %url, error = %err, "request failed");
            err
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| self.classify(&e))?;

        debug!(
            request_id = %request.id,
            method = %request.method,
            url = %url,
            status,
            "response received"
        );
        Ok(ApiResponse { status, body })
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{join_url, normalize_base_url, HttpTransport};

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        assert_eq!(normalize_base_url("https://clinic.example.org//"), "https://clinic.example.org");
        assert_eq!(normalize_base_url(" http://localhost:8080 "), "http://localhost:8080");
    }

    #[test]
    fn paths_join_with_single_slash() {
        assert_eq!(
            join_url("http://localhost:8080", "/auth/signin"),
            "http://localhost:8080/auth/signin"
        );
        assert_eq!(
            join_url("http://localhost:8080", "api/surgeries/pending-consent"),
            "http://localhost:8080/api/surgeries/pending-consent"
        );
    }

    #[test]
    fn transport_builds_full_urls() {
        let transport = HttpTransport::new("http://localhost:8080/", Duration::from_secs(30)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
        assert_eq!(
            transport.url_for("/api/surgeries/12/status"),
            "http://localhost:8080/api/surgeries/12/status"
        );
    }
}
