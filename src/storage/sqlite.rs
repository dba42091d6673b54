use super::StateStorage;
use crate::errors::{AppError, AppResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl StateStorage for SqliteStorage {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(AppError::from)
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_delete_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(&dir.path().join("nested").join("board.db")).expect("open db");
        assert!(storage.db_path().exists());

        assert_eq!(storage.get_item("state").expect("get"), None);
        storage.set_item("state", "one").expect("insert");
        storage.set_item("state", "two").expect("update");
        assert_eq!(storage.get_item("state").expect("get"), Some("two".to_string()));

        storage.remove_item("state").expect("delete");
        assert_eq!(storage.get_item("state").expect("get"), None);
    }

    #[test]
    fn writes_stamp_updated_at() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(&dir.path().join("board.db")).expect("open db");
        storage.set_item("state", "one").expect("insert");

        let conn = storage.conn.lock().expect("lock");
        let updated_at: String = conn
            .query_row("SELECT updated_at FROM kv_store WHERE key = 'state'", [], |row| row.get(0))
            .expect("row");
        assert!(chrono::DateTime::parse_from_rfc3339(&updated_at).is_ok(), "{}", updated_at);
    }

    #[test]
    fn reopening_keeps_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("board.db");
        {
            let storage = SqliteStorage::new(&path).expect("open db");
            storage.set_item("state", "kept").expect("insert");
        }
        let storage = SqliteStorage::new(&path).expect("reopen db");
        assert_eq!(storage.get_item("state").expect("get"), Some("kept".to_string()));
    }
}
