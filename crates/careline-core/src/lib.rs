//! # careline-core
//!
//! The session-aware core of the Careline clinic client.
//!
//! This crate provides:
//! - The seam traits (`Transport`, `SessionStore`, `SessionObserver`, `SurgeryBackend`)
//! - `SessionManager`, which owns the token pair and performs every
//!   authenticated call with one-shot refresh-and-retry
//! - `SurgeryService`, the REST wrapper for the surgical-decision endpoints
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use careline_core::{SessionManager, SurgeryService};
//!
//! let session = Arc::new(SessionManager::new(Box::new(transport), Box::new(store))?);
//! session.login("asingh", "s3cret")?;
//! let surgeries = SurgeryService::new(session.clone());
//! ```

pub mod service;
pub mod session;
pub mod traits;

pub use service::SurgeryService;
pub use session::SessionManager;
