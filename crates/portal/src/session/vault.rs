//! Persisted session storage.
//!
//! Two tiers back the session store: a durable JSON file that survives
//! restarts ("remember me"), and an in-memory map that dies with the process.
//! Both are plain string key-value stores; the session store owns what the
//! values mean. Write failures are logged, never surfaced — losing persistence
//! degrades to "log in again after a restart", which is not user-actionable.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Keys the session store persists.
pub mod keys {
    /// Bearer access token.
    pub const TOKEN: &str = "token";
    /// Refresh token, when issued.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// JSON-serialized [`crate::models::AccountUser`].
    pub const USER: &str = "user";

    /// Every key, for wipe operations.
    pub const ALL: [&str; 3] = [TOKEN, REFRESH_TOKEN, USER];
}

/// A string key-value store holding session material.
pub trait SessionVault: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn put(&self, key: &str, value: &str);
    /// Remove a value.
    fn delete(&self, key: &str);
    /// Remove every value.
    fn clear(&self);
}

impl<V: SessionVault + ?Sized> SessionVault for std::sync::Arc<V> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) {
        (**self).put(key, value);
    }

    fn delete(&self, key: &str) {
        (**self).delete(key);
    }

    fn clear(&self) {
        (**self).clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Durable tier
// ─────────────────────────────────────────────────────────────────────────────

/// File-backed vault: one JSON object per file, rewritten atomically.
pub struct FileVault {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileVault {
    /// Open (or create) a vault at `path`.
    ///
    /// An unreadable or unparsable file is treated as empty; the stale file
    /// is replaced on the next write.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(map) => map,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "session vault unparsable, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Rewrite the backing file from the in-memory map.
    ///
    /// Writes to a sibling temp file and renames over the target so a crash
    /// mid-write never leaves a half-written vault.
    fn persist(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent()
            && let Err(error) = fs::create_dir_all(parent)
        {
            tracing::warn!(path = %self.path.display(), %error, "could not create vault directory");
            return;
        }

        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(%error, "could not serialize session vault");
                return;
            }
        };

        let tmp = self.path.with_extension("json.tmp");
        if let Err(error) = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &self.path)) {
            tracing::warn!(path = %self.path.display(), %error, "could not write session vault");
        }
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut entries)
    }
}

impl SessionVault for FileVault {
    fn get(&self, key: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
            self.persist(entries);
        });
    }

    fn delete(&self, key: &str) {
        self.with_entries(|entries| {
            if entries.remove(key).is_some() {
                self.persist(entries);
            }
        });
    }

    fn clear(&self) {
        self.with_entries(|entries| {
            if !entries.is_empty() {
                entries.clear();
                self.persist(entries);
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session-scoped tier
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory vault; contents are gone when the process exits.
#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryVault {
    /// Create an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a vault pre-seeded with entries (test setup).
    #[must_use]
    pub fn seeded<const N: usize>(entries: [(&str, &str); N]) -> Self {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut entries)
    }
}

impl SessionVault for MemoryVault {
    fn get(&self, key: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        });
    }

    fn delete(&self, key: &str) {
        self.with_entries(|entries| {
            entries.remove(key);
        });
    }

    fn clear(&self) {
        self.with_entries(HashMap::clear);
    }
}
