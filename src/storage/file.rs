//! Local JSON history file: one latest record per product name, read whole at
//! open, rewritten whole on every append.

use crate::models::{DropEvent, PriceRecord, StoreStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::PriceStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    price: Option<f64>,
    price_text: String,
    observed_at: NaiveDateTime,
}

impl StoredEntry {
    fn into_record(self, product_key: &str) -> PriceRecord {
        PriceRecord {
            product_key: product_key.to_string(),
            price: self.price,
            price_text: self.price_text,
            observed_at: self.observed_at,
        }
    }
}

pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, StoredEntry>>,
}

impl FileStore {
    /// A missing file starts an empty history; a corrupt one is logged and
    /// replaced on the next write rather than aborting the run.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read {:?}", path))?;
            match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!("History file {:?} is corrupt ({}), starting empty", path, e);
                    BTreeMap::new()
                }
            }
        } else {
            debug!("No history file at {:?} yet", path);
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, StoredEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Could not write {:?}", self.path))?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PriceStore for FileStore {
    async fn get_latest(&self, product_key: &str) -> Result<Option<PriceRecord>> {
        let entries = self.lock();
        Ok(entries
            .get(product_key)
            .cloned()
            .map(|e| e.into_record(product_key)))
    }

    async fn append(&self, record: &PriceRecord) -> Result<()> {
        let mut entries = self.lock();

        // Latest-only semantics: an older import never shadows a newer price.
        if let Some(existing) = entries.get(&record.product_key) {
            if existing.observed_at > record.observed_at {
                debug!(
                    "{}: keeping newer record ({} > {})",
                    record.product_key, existing.observed_at, record.observed_at
                );
                return Ok(());
            }
        }

        entries.insert(
            record.product_key.clone(),
            StoredEntry {
                price: record.price,
                price_text: record.price_text.clone(),
                observed_at: record.observed_at,
            },
        );
        self.persist(&entries)
    }

    async fn get_trend(
        &self,
        product_key: &str,
        since: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<PriceRecord>> {
        let entries = self.lock();
        Ok(entries
            .get(product_key)
            .filter(|e| e.observed_at >= since)
            .cloned()
            .map(|e| e.into_record(product_key))
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn record_drop(&self, _event: &DropEvent) -> Result<()> {
        // Drop events are not persisted in file mode; the notifier's ledger
        // alone governs alert spacing.
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let entries = self.lock();
        Ok(StoreStats {
            products: entries.len(),
            records: entries.len(),
            first_observed: entries.values().map(|e| e.observed_at).min(),
            last_observed: entries.values().map(|e| e.observed_at).max(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(key: &str, price: f64, day: u32) -> PriceRecord {
        PriceRecord {
            product_key: key.to_string(),
            price: Some(price),
            price_text: format!("${:.2}", price),
            observed_at: NaiveDate::from_ymd_opt(2025, 6, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn append_then_get_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("history.json")).unwrap();

        assert!(store.get_latest("Spinach 1 bunch").await.unwrap().is_none());

        store.append(&record("Spinach 1 bunch", 2.49, 1)).await.unwrap();
        store.append(&record("Spinach 1 bunch", 1.99, 2)).await.unwrap();

        let latest = store.get_latest("Spinach 1 bunch").await.unwrap().unwrap();
        assert_eq!(latest.price, Some(1.99));

        // Idempotent reads: no intervening append, identical values.
        let again = store.get_latest("Spinach 1 bunch").await.unwrap().unwrap();
        assert_eq!(latest, again);
    }

    #[tokio::test]
    async fn older_record_does_not_shadow_newer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("history.json")).unwrap();

        store.append(&record("Carrots 2 lb bag", 3.29, 5)).await.unwrap();
        store.append(&record("Carrots 2 lb bag", 3.99, 1)).await.unwrap();

        let latest = store.get_latest("Carrots 2 lb bag").await.unwrap().unwrap();
        assert_eq!(latest.price, Some(3.29));
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.append(&record("Mint 1 bunch", 1.29, 3)).await.unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        let latest = store.get_latest("Mint 1 bunch").await.unwrap().unwrap();
        assert_eq!(latest.price, Some(1.29));
        assert_eq!(latest.price_text, "$1.29");
    }

    #[tokio::test]
    async fn trend_degrades_to_latest_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("history.json")).unwrap();
        store.append(&record("Cilantro 1 bunch", 0.99, 10)).await.unwrap();

        let since = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let trend = store.get_trend("Cilantro 1 bunch", since, 30).await.unwrap();
        assert_eq!(trend.len(), 1);

        // Window entirely after the record: nothing to report.
        let late = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(store.get_trend("Cilantro 1 bunch", late, 30).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.stats().await.unwrap().records, 0);
    }
}
