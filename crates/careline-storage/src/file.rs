//! File-backed implementation of `SessionStore`.
//!
//! The store is a single JSON object (`{"accessToken": "...", ...}`) on disk.
//! Every mutation reads the current object, applies the change, and writes
//! the whole object to a sibling temp file that is then renamed over the
//! original, so a crash never leaves a half-written session behind. A
//! process-local mutex serializes mutations.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use careline_contracts::error::{CarelineError, CarelineResult};
use careline_core::traits::SessionStore;

type Entries = BTreeMap<String, String>;

/// Persists the session between CLI invocations.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Use `path` as the backing file. Nothing is created until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> CarelineResult<Entries> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => {
                return Err(CarelineError::Storage {
                    reason: format!("failed to read '{}': {}", self.path.display(), e),
                })
            }
        };
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&contents).map_err(|e| CarelineError::Storage {
            reason: format!("corrupt session file '{}': {}", self.path.display(), e),
        })
    }

    fn write(&self, entries: &Entries) -> CarelineResult<()> {
        let storage_err = |action: &str, e: std::io::Error| CarelineError::Storage {
            reason: format!("failed to {} '{}': {}", action, self.path.display(), e),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_err("create directory for", e))?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|e| CarelineError::Storage {
            reason: format!("failed to serialize session: {}", e),
        })?;

        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, json.as_bytes()).map_err(|e| storage_err("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_err("replace", e))?;

        debug!(path = %self.path.display(), keys = entries.len(), "session file written");
        Ok(())
    }

    /// Apply `change` to the on-disk entries under the write lock.
    fn mutate(&self, change: impl FnOnce(&mut Entries)) -> CarelineResult<()> {
        let _guard = self.write_lock.lock().map_err(|e| CarelineError::Storage {
            reason: format!("session file lock poisoned: {}", e),
        })?;
        let mut entries = self.read()?;
        change(&mut entries);
        self.write(&entries)
    }
}

/// Write `contents` to a fresh file readable only by the owner on unix.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    // A leftover temp file would keep its old mode.
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> CarelineResult<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CarelineResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_all(&self, keys: &[&str]) -> CarelineResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.mutate(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }
}
