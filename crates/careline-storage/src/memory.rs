//! In-memory implementation of `SessionStore`.
//!
//! `MemoryStore` keeps entries in a `HashMap` behind `Arc<Mutex<_>>`. Clones
//! share the same map, so a test can hand one clone to the session manager
//! and inspect the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use careline_contracts::error::{CarelineError, CarelineResult};
use careline_core::traits::SessionStore;

/// A session-scoped store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> CarelineResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries.lock().map_err(|e| CarelineError::Storage {
            reason: format!("session store lock poisoned: {}", e),
        })
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> CarelineResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CarelineResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Removes every key under a single lock acquisition.
    fn remove_all(&self, keys: &[&str]) -> CarelineResult<()> {
        let mut entries = self.lock()?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}
