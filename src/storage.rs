//! Key-value persistence boundary for wallet and tap state.
//!
//! Values are plain strings, the same shape a browser's local storage holds.
//! The JSON file store rewrites the whole map on every write; the data set is
//! a handful of keys.

use crate::errors::{CasinoResult, StorageError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CasinoResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CasinoResult<()>;

    /// Write several keys at once
    fn batch_write(&self, items: &[(&str, String)]) -> CasinoResult<()> {
        for (key, value) in items {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Parse a stored value, falling back to `default` when the key is absent
pub fn load_or<T: std::str::FromStr>(
    store: &dyn KeyValueStore,
    key: &str,
    default: T,
) -> CasinoResult<T> {
    match store.get(key)? {
        Some(raw) => raw.trim().parse().map_err(|_| {
            StorageError::CorruptedData(format!("Unparseable value for {}: {}", key, raw)).into()
        }),
        None => Ok(default),
    }
}

/// Volatile store for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CasinoResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::ReadFailed("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CasinoResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::WriteFailed("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file doesn't exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> CasinoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StorageError::CorruptedData(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened state file");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> CasinoResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode state: {}", e)))?;

        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                StorageError::WriteFailed(format!("{}: {}", self.path.display(), e)).into()
            })
    }

    fn update<F>(&self, apply: F) -> CasinoResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::WriteFailed("state file lock poisoned".to_string()))?;
        apply(&mut entries);
        self.flush(&entries)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> CasinoResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::ReadFailed("state file lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CasinoResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn batch_write(&self, items: &[(&str, String)]) -> CasinoResult<()> {
        self.update(|entries| {
            for (key, value) in items {
                entries.insert(key.to_string(), value.clone());
            }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CasinoError;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("casino_balance").unwrap(), None);
        store.set("casino_balance", "100").unwrap();
        assert_eq!(store.get("casino_balance").unwrap().as_deref(), Some("100"));
        assert_eq!(store.get("missing").unwrap(), None);
        assert_eq!(load_or(&store, "casino_balance", 0.0).unwrap(), 100.0);
        assert_eq!(load_or(&store, "tap_power", 1u32).unwrap(), 1);
    }

    #[test]
    fn test_corrupted_value() {
        let store = MemoryStore::new();
        store.set("tap_power", "lots").unwrap();
        match load_or(&store, "tap_power", 1u32) {
            Err(CasinoError::Storage(StorageError::CorruptedData(msg))) => {
                assert!(msg.contains("tap_power"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_json_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store
                .batch_write(&[
                    ("casino_balance", "42.5".to_string()),
                    ("tap_power", "3".to_string()),
                ])
                .unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(load_or(&store, "casino_balance", 0.0).unwrap(), 42.5);
        assert_eq!(load_or(&store, "tap_power", 1u32).unwrap(), 3);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(CasinoError::Storage(StorageError::CorruptedData(_)))
        ));
    }
}
