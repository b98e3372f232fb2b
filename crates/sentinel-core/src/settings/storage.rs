// ── Key-value persistence backends ──

use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::debug;

use crate::error::CoreError;
use crate::observable::lock;

/// A minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

// ── File backend ─────────────────────────────────────────────────────

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so
/// a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CoreError::validation("storage key", format!("'{key}' is not a safe file name")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::persistence(format_args!("{}: {e}", path.display()))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        let err = |e: std::io::Error| CoreError::persistence(format_args!("{}: {e}", path.display()));

        fs::create_dir_all(&self.dir).map_err(err)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(err)?;
            file.write_all(value.as_bytes()).map_err(err)?;
            file.sync_all().map_err(err)?;
        }
        fs::rename(&tmp, &path).map_err(err)?;

        debug!(path = %path.display(), bytes = value.len(), "settings written");
        Ok(())
    }
}

// ── In-memory backend ────────────────────────────────────────────────

/// Volatile store that counts writes. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a value without counting it as a write.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        self
    }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::persistence("storage quota exceeded"));
        }
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert!(store.get("settings").unwrap().is_none());
        store.set("settings", r#"{"a":1}"#).unwrap();
        assert_eq!(store.get("settings").unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert!(!dir.path().join("nested/settings.json.tmp").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let store = FileStore::new("/tmp");
        assert!(matches!(
            store.set("../escape", "x"),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn memory_store_counts_and_fails_on_demand() {
        let store = MemoryStore::new().with_entry("k", "seed");
        assert_eq!(store.writes(), 0);
        store.set("k", "v").unwrap();
        assert_eq!(store.writes(), 1);

        store.fail_writes(true);
        assert!(store.set("k", "w").is_err());
        assert_eq!(store.raw("k").as_deref(), Some("v"));
    }
}
