//! Price history persistence behind one interface.
//!
//! Two backends, selected once at startup: a local JSON history file
//! (latest record per product, rewritten whole on each append) and a remote
//! document store (full per-record history, client-side filtering).
//!
//! The pipeline runs one instance at a time; if two runs do overlap, the
//! read-modify-write around "latest price" is last-writer-wins. That race is
//! accepted, not coordinated.

pub mod file;
pub mod remote;

use crate::config::{StorageBackend, StorageConfig};
use crate::models::{DropEvent, PriceRecord, StoreStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use self::file::FileStore;
pub use self::remote::RemoteStore;

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Newest stored record for a product, or None if never seen.
    async fn get_latest(&self, product_key: &str) -> Result<Option<PriceRecord>>;

    /// Store one observation. The newest timestamp wins `get_latest`;
    /// timestamp ties resolve to the later insertion.
    async fn append(&self, record: &PriceRecord) -> Result<()>;

    /// Records since `since`, newest first, at most `limit`.
    /// The file backend degrades to at most the latest record.
    async fn get_trend(
        &self,
        product_key: &str,
        since: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<PriceRecord>>;

    /// Persist a detected drop where the backend keeps alert history.
    async fn record_drop(&self, event: &DropEvent) -> Result<()>;

    async fn stats(&self) -> Result<StoreStats>;
}

/// Resolve the configured backend. Called once at startup.
pub async fn open_store(config: &StorageConfig) -> Result<Box<dyn PriceStore>> {
    match config.backend {
        StorageBackend::File => {
            let store = FileStore::open(&config.history_path)
                .with_context(|| format!("Failed to open history file {:?}", config.history_path))?;
            Ok(Box::new(store))
        }
        StorageBackend::Remote => {
            let store = RemoteStore::connect(&config.remote_uri, &config.remote_database)
                .await
                .context("Failed to connect to remote store")?;
            Ok(Box::new(store))
        }
    }
}
