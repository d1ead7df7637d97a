//! # careline-config
//!
//! TOML-driven configuration for the Careline client.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use careline_config::ClientConfig;
//!
//! let config = ClientConfig::from_file(Path::new("careline.toml"))?;
//! println!("talking to {}", config.api.base_url);
//! ```
//!
//! Missing sections and fields fall back to defaults: a local backend on
//! port 8080, a 30 second timeout, and a session file under `.careline/`.

pub mod config;

pub use config::{ApiConfig, ClientConfig, SessionConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────
