//! Client configuration schema and loader.
//!
//! A `ClientConfig` is deserialized from TOML. Every field has a default, so
//! an empty document (or no file at all) yields a usable local setup.
//!
//! ```toml
//! [api]
//! base_url = "https://clinic.example.org"
//! timeout_secs = 30
//!
//! [session]
//! store_path = ".careline/session.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use careline_contracts::error::{CarelineError, CarelineResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STORE_PATH: &str = ".careline/session.json";

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the REST backend, without a trailing path.
    pub base_url: String,
    /// Per-request timeout. Calls exceeding it fail and are not retried.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where the session is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub store_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

/// The top-level structure deserialized from a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `CarelineError::Config` if the TOML is malformed or a value is
    /// out of range.
    pub fn from_toml_str(s: &str) -> CarelineResult<Self> {
        let config: ClientConfig = toml::from_str(s).map_err(|e| CarelineError::Config {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    ///
    /// A relative `session.store_path` is resolved against the file's
    /// directory.
    pub fn from_file(path: &Path) -> CarelineResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CarelineError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if config.session.store_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.session.store_path = dir.join(&config.session.store_path);
            }
        }
        debug!(
            path = %path.display(),
            base_url = %config.api.base_url,
            "loaded client config"
        );
        Ok(config)
    }

    /// Replace the backend URL (e.g. from a command-line flag).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> CarelineResult<Self> {
        self.api.base_url = base_url.into();
        self.validate()?;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    fn validate(&self) -> CarelineResult<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            return Err(CarelineError::Config {
                reason: "api.base_url must not be empty".to_string(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CarelineError::Config {
                reason: format!("api.base_url '{}' must start with http:// or https://", url),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(CarelineError::Config {
                reason: "api.timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.session.store_path.as_os_str().is_empty() {
            return Err(CarelineError::Config {
                reason: "session.store_path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
