//! Small persisted key/value store shared by hosted apps.
//!
//! Values are kept as JSON. A store opened on a path rewrites the whole
//! file after each mutation; an in-memory store never touches disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store {path} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct StoreInner {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

/// Cloneable handle; clones share the same values.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    inner: Arc<Mutex<StoreInner>>,
}

/// Default location of the desktop store file.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("term-desk")
        .join("store.json")
}

impl KvStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing or blank file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            Map::new()
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "opened store");
        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner {
                path: Some(path),
                values,
            })),
        })
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.lock().ok().and_then(|inner| inner.path.clone())
    }

    /// Typed read. Missing keys and values of another shape read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let inner = self.inner.lock().ok()?;
        let value = inner.values.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring malformed store value");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.values.insert(key.to_string(), value);
        inner.persist()
    }

    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        if inner.values.remove(key).is_none() {
            return Ok(false);
        }
        inner.persist().map(|()| true)
    }
}

impl StoreInner {
    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = serde_json::to_string_pretty(&self.values).map_err(|source| {
            StoreError::Encode {
                key: String::from("*"),
                source,
            }
        })?;
        fs::write(path, contents).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get::<String>("chat.username"), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let store = KvStore::open(&path).unwrap();
        store.set("chat.username", &"ada").unwrap();
        store.set("scores", &vec![3u32, 1, 2]).unwrap();

        let reopened = KvStore::open(&path).unwrap();
        assert_eq!(reopened.get::<String>("chat.username").as_deref(), Some("ada"));
        assert_eq!(reopened.get::<Vec<u32>>("scores"), Some(vec![3, 1, 2]));
    }

    #[test]
    fn wrong_shape_reads_as_none() {
        let store = KvStore::in_memory();
        store.set("n", &5).unwrap();
        assert_eq!(store.get::<String>("n"), None);
        assert_eq!(store.get::<i64>("n"), Some(5));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(KvStore::open(&path), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn clones_share_values() {
        let store = KvStore::in_memory();
        let other = store.clone();
        store.set("k", &true).unwrap();
        assert_eq!(other.get::<bool>("k"), Some(true));
        assert!(other.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }
}
