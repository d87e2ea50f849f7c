//! Remote document store: full per-record history across three collections
//! (products, price_history, alerts). Collections are insert-and-scan only —
//! date filtering and sorting happen client-side after fetching the matching
//! records, since no server-side indexes are assumed.

use crate::models::{DropEvent, PriceRecord, StoreStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::PriceStore;

fn to_millis(t: NaiveDateTime) -> i64 {
    t.and_utc().timestamp_millis()
}

fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|t| t.naive_utc())
}

// ── Documents ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct ProductDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    brand: Option<String>,
    category: Option<String>,
    unit: Option<String>,
    enabled: bool,
    priority: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PriceDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    product_id: ObjectId,
    price: Option<f64>,
    price_text: String,
    observed_at: i64,
}

impl PriceDoc {
    fn into_record(self, product_key: &str) -> Option<PriceRecord> {
        Some(PriceRecord {
            product_key: product_key.to_string(),
            price: self.price,
            price_text: self.price_text,
            observed_at: from_millis(self.observed_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AlertDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    product_id: ObjectId,
    old_price: f64,
    new_price: f64,
    savings_amount: f64,
    savings_percentage: f64,
    created_at: i64,
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct RemoteStore {
    products: Collection<ProductDoc>,
    history: Collection<PriceDoc>,
    alerts: Collection<AlertDoc>,
}

impl RemoteStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Could not reach document store")?;
        let db = client.database(database);
        info!("Connected to remote store, database {:?}", database);

        Ok(Self {
            products: db.collection("products"),
            history: db.collection("price_history"),
            alerts: db.collection("alerts"),
        })
    }

    async fn find_product(&self, name: &str) -> Result<Option<ProductDoc>> {
        Ok(self.products.find_one(doc! { "name": name }).await?)
    }

    /// Product documents are created lazily on first write for a key.
    async fn ensure_product(&self, name: &str) -> Result<ObjectId> {
        let now = to_millis(Utc::now().naive_utc());

        if let Some(existing) = self.find_product(name).await? {
            if let Some(id) = existing.id {
                self.products
                    .update_one(doc! { "_id": id }, doc! { "$set": { "updated_at": now } })
                    .await?;
                return Ok(id);
            }
        }

        let result = self
            .products
            .insert_one(ProductDoc {
                id: None,
                name: name.to_string(),
                brand: None,
                category: None,
                unit: None,
                enabled: true,
                priority: 1,
                created_at: now,
                updated_at: now,
            })
            .await?;

        result
            .inserted_id
            .as_object_id()
            .context("Product insert returned no ObjectId")
    }

    async fn records_for(&self, product_id: ObjectId) -> Result<Vec<PriceDoc>> {
        let cursor = self.history.find(doc! { "product_id": product_id }).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl PriceStore for RemoteStore {
    async fn get_latest(&self, product_key: &str) -> Result<Option<PriceRecord>> {
        let Some(product) = self.find_product(product_key).await? else {
            return Ok(None);
        };
        let Some(product_id) = product.id else {
            return Ok(None);
        };

        let docs = self.records_for(product_id).await?;
        debug!("{}: {} stored records", product_key, docs.len());

        let mut latest: Option<PriceDoc> = None;
        for d in docs {
            // `>=` so a timestamp tie resolves to the later insertion.
            if latest.as_ref().is_none_or(|l| d.observed_at >= l.observed_at) {
                latest = Some(d);
            }
        }

        Ok(latest.and_then(|d| d.into_record(product_key)))
    }

    async fn append(&self, record: &PriceRecord) -> Result<()> {
        let product_id = self.ensure_product(&record.product_key).await?;
        self.history
            .insert_one(PriceDoc {
                id: None,
                product_id,
                price: record.price,
                price_text: record.price_text.clone(),
                observed_at: to_millis(record.observed_at),
            })
            .await
            .with_context(|| format!("append({})", record.product_key))?;
        Ok(())
    }

    async fn get_trend(
        &self,
        product_key: &str,
        since: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<PriceRecord>> {
        let Some(product) = self.find_product(product_key).await? else {
            return Ok(Vec::new());
        };
        let Some(product_id) = product.id else {
            return Ok(Vec::new());
        };

        let cutoff = to_millis(since);
        let mut docs: Vec<PriceDoc> = self
            .records_for(product_id)
            .await?
            .into_iter()
            .filter(|d| d.observed_at >= cutoff)
            .collect();
        docs.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        docs.truncate(limit);

        Ok(docs
            .into_iter()
            .filter_map(|d| d.into_record(product_key))
            .collect())
    }

    async fn record_drop(&self, event: &DropEvent) -> Result<()> {
        let product_id = self.ensure_product(&event.product_key).await?;
        self.alerts
            .insert_one(AlertDoc {
                id: None,
                product_id,
                old_price: event.old_price,
                new_price: event.new_price,
                savings_amount: event.savings_amount,
                savings_percentage: event.savings_percentage,
                created_at: to_millis(Utc::now().naive_utc()),
            })
            .await
            .with_context(|| format!("record_drop({})", event.product_key))?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let products = self.products.count_documents(doc! {}).await?;
        let cursor = self.history.find(doc! {}).await?;
        let docs: Vec<PriceDoc> = cursor.try_collect().await?;

        Ok(StoreStats {
            products: products as usize,
            records: docs.len(),
            first_observed: docs.iter().filter_map(|d| from_millis(d.observed_at)).min(),
            last_observed: docs.iter().filter_map(|d| from_millis(d.observed_at)).max(),
        })
    }
}
