use crate::errors::{AppError, AppResult};
use crate::persistence::DEFAULT_STORAGE_KEY;
use crate::storage::{FileStorage, MemoryStorage, SqliteStorage, StateStorage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORAGE_KEY_ENV: &str = "HABIT_BOARD_STORAGE_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    File {
        dir: PathBuf,
    },
    Sqlite {
        path: PathBuf,
    },
}

impl StorageConfig {
    pub fn open(&self) -> AppResult<Box<dyn StateStorage>> {
        Ok(match self {
            Self::Memory => Box::new(MemoryStorage::new()),
            Self::File { dir } => Box::new(FileStorage::new(dir)?),
            Self::Sqlite { path } => Box::new(SqliteStorage::new(path)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub storage: StorageConfig,
    pub storage_key: String,
    pub app_version: String,
    pub log_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// Reads the YAML file when given, otherwise starts from defaults, then
    /// applies environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .map_err(|error| AppError::Config(format!("{}: {}", path.to_string_lossy(), error)))?;
                Self::from_yaml_str(&raw)?
            }
            None => Self::default(),
        };
        config
            .with_overrides(|name| std::env::var(name).ok())
            .validated()
    }

    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(AppError::from)
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(STORAGE_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            self.storage_key = key.trim().to_string();
        }
        self
    }

    pub fn validated(self) -> AppResult<Self> {
        if self.storage_key.trim().is_empty() {
            return Err(AppError::Config("storageKey must not be empty".to_string()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(AppError::Config("logFilter must not be empty".to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_means_defaults() {
        let config = StoreConfig::from_yaml_str("").expect("defaults");
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.storage_key, "habit-board/state");
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn yaml_selects_backend_and_keeps_other_defaults() {
        let config = StoreConfig::from_yaml_str(
            "storage:\n  kind: sqlite\n  path: /var/lib/habit-board/board.db\nlogDir: /var/log/habit-board\n",
        )
        .expect("parse");
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite {
                path: PathBuf::from("/var/lib/habit-board/board.db")
            }
        );
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/habit-board")));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let error = StoreConfig::from_yaml_str("storage:\n  kind: cloud\n").expect_err("bad kind");
        assert!(matches!(error, AppError::Config(_)));
    }

    #[test]
    fn env_override_replaces_storage_key() {
        let config = StoreConfig::default().with_overrides(|name| {
            (name == STORAGE_KEY_ENV).then(|| " board/dev ".to_string())
        });
        assert_eq!(config.storage_key, "board/dev");

        let untouched = StoreConfig::default().with_overrides(|_| Some("  ".to_string()));
        assert_eq!(untouched.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("board.yaml");
        let data_dir = dir.path().join("data");
        std::fs::write(
            &path,
            format!("storage:\n  kind: file\n  dir: {}\nlogFilter: debug\n", data_dir.display()),
        )
        .expect("write config");

        let config = StoreConfig::load(Some(&path)).expect("load");
        assert_eq!(config.storage, StorageConfig::File { dir: data_dir });
        assert_eq!(config.log_filter, "debug");

        let storage = config.storage.open().expect("open storage");
        assert_eq!(storage.backend(), "file");
    }

    #[test]
    fn blank_storage_key_fails_validation() {
        let config = StoreConfig {
            storage_key: " ".to_string(),
            ..StoreConfig::default()
        };
        assert!(config.validated().is_err());
    }
}
