//! Durable local stores
//!
//! A synchronous string-keyed get/set/remove surface that outlives a single
//! session. `MemoryLocalStore` lives as long as the process; `FileLocalStore`
//! keeps one `<key>.json` file per key under a directory and survives restarts.

use crate::error::LocalStoreError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// String-keyed durable storage
pub trait DurableLocalStore: Send + Sync {
    /// Read a key
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    /// Write a key
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

    /// Delete a key (absent keys are not an error)
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, sorted by key
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of keys present
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no keys are present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl DurableLocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Directory-backed store, one file per key
#[derive(Debug)]
pub struct FileLocalStore {
    root: PathBuf,
    // Serializes temp-file + rename sequences within this process.
    write_lock: Mutex<()>,
}

impl FileLocalStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| LocalStoreError::io_error(&root, e))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the keys
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(LocalStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DurableLocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LocalStoreError::io_error(path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        let path = self.key_path(key)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));

        let _guard = self.write_lock.lock();
        fs::write(&tmp, value).map_err(|e| LocalStoreError::io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| LocalStoreError::io_error(&path, e))
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        let path = self.key_path(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LocalStoreError::io_error(path, e)),
        }
    }
}
