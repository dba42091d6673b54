//! Key/value "local storage" the persistence adapter writes its blob into.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::errors::{AppError, AppResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait StateStorage: Send + Sync {
    fn backend(&self) -> &'static str;
    fn get_item(&self, key: &str) -> AppResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove_item(&self, key: &str) -> AppResult<()>;
}

/// Process-local storage. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| AppError::Internal("memory storage mutex poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AppError::Internal("memory storage mutex poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AppError::Internal("memory storage mutex poisoned".to_string()))?;
        items.remove(key);
        Ok(())
    }
}

/// Everything except ASCII alphanumerics and `._-` is escaped, so distinct
/// keys always map to distinct file names.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'_').remove(b'-');

/// One JSON file per key under `root`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: &Path) -> AppResult<Self> {
        fs::create_dir_all(root).map_err(|error| AppError::Io(error.to_string()))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let stem = utf8_percent_encode(key, KEY_ENCODE_SET);
        self.root.join(format!("{}.json", stem))
    }
}

impl StateStorage for FileStorage {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|error| AppError::Io(format!("{}: {}", path.to_string_lossy(), error)))
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|error| AppError::Io(error.to_string()))?;
        fs::rename(&staging, &path).map_err(|error| AppError::Io(error.to_string()))
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }
}
