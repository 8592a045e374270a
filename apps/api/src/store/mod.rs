//! Pluggable persistence for the candidate collection.
//!
//! Every backend exposes the same `load()` / `save()` pair and is carried in
//! `AppState` as `Arc<dyn CandidateStore>`, so the import pipeline and the
//! HTTP layer never know which one is behind them.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::candidates::{Candidate, EngineError};
use crate::config::{Config, StoreBackend};
use crate::db::create_pool;

pub mod json_file;
pub mod memory;
pub mod postgres;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PgCandidateStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("stored collection is invalid: {0}")]
    Invalid(#[from] EngineError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Whole-collection persistence. `save` receives the complete, merged
/// collection and must leave the backend holding exactly that.
///
/// Implementations do no locking of their own; callers serialize writers.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Candidate>, StoreError>;

    async fn save(&self, candidates: &[Candidate]) -> Result<(), StoreError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Opens the backend selected by configuration.
pub async fn open_store(config: &Config) -> Result<Arc<dyn CandidateStore>> {
    let store: Arc<dyn CandidateStore> = match config.store_backend {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&config.data_path)),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required when STORE_BACKEND=postgres")?;
            let store = PgCandidateStore::new(create_pool(url).await?);
            store.ensure_schema().await?;
            Arc::new(store)
        }
    };
    info!("Candidate store: {}", store.describe());
    Ok(store)
}
