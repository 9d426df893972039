use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};

/// Storage key holding the friend-name list
pub const FRIENDS_KEY: &str = "friends";
/// Storage key holding the send-record list
pub const RECORDS_KEY: &str = "records";

/// Error type for storage and book-directory operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable for '{key}': {reason}")]
    StorageUnavailable { key: String, reason: String },
    #[error("not a postbook: no postbook/ directory found")]
    NotABook,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse book.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoreError {
    fn unavailable(key: &str, reason: impl ToString) -> Self {
        StoreError::StorageUnavailable {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A synchronous key-value store holding JSON text per key.
pub trait Storage {
    /// Read the value under `key`; `None` if it was never written.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key`.
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Called when the value under `key` could not be parsed and is about to
    /// be treated as empty. Stores that can keep a copy should.
    fn quarantine(&mut self, _key: &str, _raw: &str) {}
}

// ---------------------------------------------------------------------------
// Directory store
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a book directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirStore { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for DirStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::unavailable(key, e)),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Err(e) = recovery::atomic_write(&path, value.as_bytes()) {
            log::error!("write of {} failed: {}", path.display(), e);
            recovery::log_recovery(
                &self.dir,
                RecoveryEntry {
                    timestamp: Utc::now(),
                    category: RecoveryCategory::Write,
                    description: format!("{} write failed", key),
                    fields: vec![
                        ("Target".to_string(), format!("{}.json", key)),
                        ("Error".to_string(), e.to_string()),
                    ],
                    body: value.to_string(),
                },
            );
            return Err(StoreError::unavailable(key, e));
        }
        log::debug!("saved {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::unavailable(key, e)),
        }
    }

    fn quarantine(&mut self, key: &str, raw: &str) {
        let path = self.path_for(key);
        let aside = path.with_extension("json.corrupt");
        if let Err(e) = std::fs::rename(&path, &aside) {
            log::warn!("could not move {} aside: {}", path.display(), e);
        }
        recovery::log_recovery(
            &self.dir,
            RecoveryEntry {
                timestamp: Utc::now(),
                category: RecoveryCategory::Parse,
                description: format!("unreadable {} data set aside", key),
                fields: vec![("Source".to_string(), format!("{}.json", key))],
                body: raw.to_string(),
            },
        );
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Map-backed store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    /// Keys whose writes fail with `StorageUnavailable`
    failing: Vec<String>,
    /// `(key, raw)` pairs handed to `quarantine`
    pub quarantined: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Make every later write to `key` fail.
    pub fn fail_writes_to(&mut self, key: &str) {
        self.failing.push(key.to_string());
    }

    /// Let writes to every key succeed again.
    pub fn heal(&mut self) {
        self.failing.clear();
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl Storage for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.failing.iter().any(|k| k == key) {
            return Err(StoreError::unavailable(key, "quota exceeded"));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.failing.iter().any(|k| k == key) {
            return Err(StoreError::unavailable(key, "quota exceeded"));
        }
        self.values.remove(key);
        Ok(())
    }

    fn quarantine(&mut self, key: &str, raw: &str) {
        self.quarantined.push((key.to_string(), raw.to_string()));
    }
}
