//! # careline-storage
//!
//! `SessionStore` implementations for the Careline client.
//!
//! - [`MemoryStore`] keeps the session for the lifetime of the process.
//! - [`FileStore`] persists it as a JSON object so the CLI stays signed in
//!   between invocations.
//!
//! Both clear the session keys in one operation (`remove_all`), so a logout
//! or failed refresh never leaves a token behind without its partner.
//!
//! ```rust,ignore
//! use careline_storage::FileStore;
//! use careline_core::SessionManager;
//!
//! let store = FileStore::new(".careline/session.json");
//! let session = SessionManager::new(Box::new(transport), Box::new(store))?;
//! ```

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
