pub mod actions;
pub mod config;
mod errors;
pub mod ids;
pub mod migration;
pub mod models;
pub mod persistence;
pub mod seed;
pub mod selectors;
pub mod storage;
pub mod store;

pub use crate::actions::Snapshot;
pub use crate::config::{StorageConfig, StoreConfig};
pub use crate::errors::{AppError, AppResult};
pub use crate::persistence::PersistenceAdapter;
pub use crate::store::{Store, SubscriptionId};

use std::path::Path;
use std::sync::OnceLock;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Composition root: logging, storage backend, persistence adapter and store.
pub fn bootstrap(config: &StoreConfig) -> AppResult<Store> {
    if let Some(log_dir) = &config.log_dir {
        if let Err(error) = init_tracing(log_dir, &config.log_filter) {
            tracing::warn!(error = %error, "tracing already initialized; keeping existing subscriber");
        }
    }

    let storage = config.storage.open()?;
    let persistence = PersistenceAdapter::new(storage, &config.storage_key, &config.app_version);
    Store::open(persistence)
}

pub fn init_tracing(log_dir: &Path, default_filter: &str) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "habit-board.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
