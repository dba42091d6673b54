//! Forward migration of persisted state blobs.
//!
//! Blobs carry a `schemaVersion`. On load every step whose target is above
//! the stored version runs in order over the raw JSON object, then every
//! step runs once more to fill collections saved as null, then the current
//! version is stamped. Steps only add what is missing, so running them again
//! over an already-migrated blob changes nothing.

use crate::errors::{AppError, AppResult};
use serde_json::{json, Map, Value};

pub const CURRENT_SCHEMA_VERSION: u32 = 3;

pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";

pub struct Migration {
    pub target_version: u32,
    pub description: &'static str,
    pub up: fn(&mut Map<String, Value>) -> AppResult<()>,
}

/// All migrations in chronological order.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            target_version: 1,
            description: "base habit and todo collections",
            up: ensure_base_collections,
        },
        Migration {
            target_version: 2,
            description: "todo folders",
            up: ensure_todo_folders,
        },
        Migration {
            target_version: 3,
            description: "lab projects, tags and logs",
            up: ensure_lab,
        },
    ]
}

/// Stored version of a blob; absent means a legacy, pre-versioning blob.
pub fn schema_version(blob: &Map<String, Value>) -> AppResult<u32> {
    match blob.get(SCHEMA_VERSION_KEY) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|version| u32::try_from(version).ok())
            .ok_or_else(|| AppError::Migration(format!("invalid {}: {}", SCHEMA_VERSION_KEY, value))),
    }
}

pub fn migrate(blob: Value) -> AppResult<Value> {
    let Value::Object(mut object) = blob else {
        return Err(AppError::Migration("persisted state is not a JSON object".to_string()));
    };

    let from_version = schema_version(&object)?;
    if from_version > CURRENT_SCHEMA_VERSION {
        tracing::warn!(
            stored_version = from_version,
            current_version = CURRENT_SCHEMA_VERSION,
            "persisted state is newer than this build; loading best-effort"
        );
    }

    for migration in all_migrations() {
        if migration.target_version <= from_version {
            continue;
        }
        (migration.up)(&mut object).map_err(|error| {
            AppError::Migration(format!(
                "step {} ({}) failed: {}",
                migration.target_version, migration.description, error
            ))
        })?;
        tracing::info!(
            target_version = migration.target_version,
            description = migration.description,
            "applied state migration"
        );
    }
    repair_shape(&mut object)?;

    if from_version <= CURRENT_SCHEMA_VERSION {
        object.insert(SCHEMA_VERSION_KEY.to_string(), json!(CURRENT_SCHEMA_VERSION));
    }
    Ok(Value::Object(object))
}

/// Reruns every step regardless of the stored version, so null or missing
/// collections in an up-to-date blob load as empty ones.
fn repair_shape(object: &mut Map<String, Value>) -> AppResult<()> {
    for migration in all_migrations() {
        (migration.up)(object)?;
    }
    Ok(())
}

fn ensure_base_collections(object: &mut Map<String, Value>) -> AppResult<()> {
    for key in ["categories", "habits", "dailyScores", "dayLocks", "todos", "todoArchive"] {
        ensure_object(object, key)?;
    }
    ensure_object(object, "uiState")
}

fn ensure_todo_folders(object: &mut Map<String, Value>) -> AppResult<()> {
    ensure_object(object, "todoFolders")
}

fn ensure_lab(object: &mut Map<String, Value>) -> AppResult<()> {
    let lab = object.entry("lab").or_insert(Value::Null);
    if !lab.is_object() {
        *lab = json!({});
    }
    let Value::Object(lab) = lab else {
        return Err(AppError::Migration("lab is not an object".to_string()));
    };

    if lab.get("version").map_or(true, Value::is_null) {
        lab.insert("version".to_string(), json!(1));
    }
    for key in ["projects", "tagsByProject", "tagOrderByProject", "dailyLogsByProject", "eventLogsByProject"] {
        ensure_object(lab, key)?;
    }
    match lab.get("projectOrder") {
        Some(Value::Array(_)) => {}
        Some(Value::Null) | None => {
            lab.insert("projectOrder".to_string(), json!([]));
        }
        Some(other) => {
            return Err(AppError::Migration(format!("lab.projectOrder must be a list, got {}", other)));
        }
    }
    Ok(())
}

/// Inserts `{}` for a missing or null key; any other non-object is an error.
fn ensure_object(object: &mut Map<String, Value>, key: &str) -> AppResult<()> {
    match object.get(key) {
        Some(Value::Object(_)) => Ok(()),
        Some(Value::Null) | None => {
            object.insert(key.to_string(), json!({}));
            Ok(())
        }
        Some(other) => Err(AppError::Migration(format!(
            "{} must be an object, got {}",
            key,
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
