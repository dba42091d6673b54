use crate::errors::{AppError, AppResult};
use crate::migration::{self, CURRENT_SCHEMA_VERSION};
use crate::ids;
use crate::models::{AppState, Meta};
use crate::storage::StateStorage;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_STORAGE_KEY: &str = "habit-board/state";

/// What actually lands in storage: the snapshot plus version and save time.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    state: &'a AppState,
}

/// Reads and writes the whole snapshot as one JSON blob under a single key.
pub struct PersistenceAdapter {
    storage: Box<dyn StateStorage>,
    key: String,
    app_version: String,
}

impl PersistenceAdapter {
    pub fn new(storage: Box<dyn StateStorage>, key: &str, app_version: &str) -> Self {
        Self {
            storage,
            key: key.to_string(),
            app_version: app_version.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &'static str {
        self.storage.backend()
    }

    /// Loads the persisted snapshot, migrating older blobs forward. An absent
    /// blob yields a fresh default state.
    pub fn load_state(&self) -> AppResult<AppState> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            tracing::info!(
                backend = self.backend(),
                key = %self.key,
                "no persisted state found; starting fresh"
            );
            return Ok(AppState::new(&self.app_version));
        };

        let blob: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|error| AppError::Storage(format!("persisted state is not valid JSON: {}", error)))?;
        let mut migrated = migration::migrate(blob)?;
        if let Some(object) = migrated.as_object_mut() {
            if object.get("meta").map_or(true, serde_json::Value::is_null) {
                let meta = Meta {
                    app_version: self.app_version.clone(),
                    created_at: ids::now(),
                };
                object.insert("meta".to_string(), serde_json::to_value(meta)?);
            }
        }
        let state: AppState = serde_json::from_value(migrated)
            .map_err(|error| AppError::Migration(format!("persisted state has an unexpected shape: {}", error)))?;

        tracing::debug!(
            backend = self.backend(),
            key = %self.key,
            categories = state.categories.len(),
            habits = state.habits.len(),
            todos = state.todos.len(),
            "loaded persisted state"
        );
        Ok(state)
    }

    pub fn save_state(&self, state: &AppState) -> AppResult<()> {
        let envelope = Envelope {
            schema_version: CURRENT_SCHEMA_VERSION,
            saved_at: Utc::now(),
            state,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.storage.set_item(&self.key, &raw)
    }

    pub fn clear(&self) -> AppResult<()> {
        self.storage.remove_item(&self.key)
    }
}
