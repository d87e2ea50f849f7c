//! Pipeline orchestrator: one scrape → match → detect → notify pass per
//! invocation.
//!
//! Scheduling is external (cron re-invokes `run`); the pipeline itself never
//! loops. A fetch failure aborts the run gracefully with no partial history
//! updates. Storage and notification failures are logged and the run
//! continues for the remaining products; a failed history write risks a
//! duplicate alert on the next run, which is the accepted tradeoff.

use crate::config::AppConfig;
use crate::detector::detect_drop;
use crate::export;
use crate::matcher::ProductMatcher;
use crate::models::{ScrapedObservation, TrackedProduct};
use crate::notifier::Notifier;
use crate::scraper::cleaner::{observation_to_record, parse_price};
use crate::scraper::{CategoryScraper, ObservationSource};
use crate::storage::{self, PriceStore};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

pub struct Pipeline {
    config: AppConfig,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub candidates: usize,
    pub matched: usize,
    pub drops: usize,
    pub alerts_sent: usize,
    pub errors: usize,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<PipelineStats> {
        let store = storage::open_store(&self.config.storage)
            .await
            .context("Failed to open history store")?;

        let scraper = CategoryScraper::new(&self.config.scraper, &self.config.extractor)
            .context("Failed to build scraper")?;

        let matcher = ProductMatcher::new(catalog_from(&self.config), self.config.matcher.clone());
        let mut notifier = Notifier::new(&self.config);

        info!("Tracking {} products", self.config.catalog.products.len());
        self.run_with(&scraper, store.as_ref(), &matcher, &mut notifier)
            .await
    }

    async fn run_with(
        &self,
        source: &dyn ObservationSource,
        store: &dyn PriceStore,
        matcher: &ProductMatcher,
        notifier: &mut Notifier,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        // ── 1. Scrape ─────────────────────────────────────────────────────────
        info!("=== Step 1: Scraping category page ===");
        let observations = match source.fetch_observations().await {
            Ok(o) => o,
            Err(e) => {
                error!("Fetch failed, aborting this run: {:#}", e);
                stats.errors += 1;
                return Ok(stats);
            }
        };
        stats.candidates = observations.len();

        // ── 2. Match against the catalog ──────────────────────────────────────
        info!("=== Step 2: Matching against catalog ===");
        let matched: Vec<(TrackedProduct, ScrapedObservation)> = observations
            .into_iter()
            .filter_map(|obs| {
                matcher
                    .match_catalog(&obs.name)
                    .cloned()
                    .map(|product| (product, obs))
            })
            .collect();
        stats.matched = matched.len();
        info!(
            "{} of {} candidates matched tracked products",
            stats.matched, stats.candidates
        );

        if matched.is_empty() {
            info!("No tracked products found on the page this run");
            return Ok(stats);
        }

        // ── 3. CSV export ─────────────────────────────────────────────────────
        info!("=== Step 3: Exporting matched rows ===");
        match export::append_observations(&self.config.storage.export_path, &matched) {
            Ok(n) => info!("{} rows appended to {:?}", n, self.config.storage.export_path),
            Err(e) => {
                warn!("CSV export failed: {:#}", e);
                stats.errors += 1;
            }
        }

        // ── 4. Detect drops and notify ────────────────────────────────────────
        info!("=== Step 4: Checking for price drops ===");
        for (product, obs) in &matched {
            let Some(price_text) = obs.price_text.as_deref() else {
                continue;
            };
            let Some(price) = parse_price(price_text) else {
                warn!("{}: unparsable price {:?}", product.name, price_text);
                continue;
            };

            let last = match store.get_latest(&product.name).await {
                Ok(last) => last,
                Err(e) => {
                    warn!("{}: history read failed: {:#}", product.name, e);
                    stats.errors += 1;
                    None
                }
            };

            if let Some(event) = detect_drop(&product.name, last.as_ref(), price) {
                info!(
                    "{}: ${:.2} → ${:.2} (save ${:.2}, {:.1}%)",
                    event.product_key,
                    event.old_price,
                    event.new_price,
                    event.savings_amount,
                    event.savings_percentage
                );
                stats.drops += 1;

                if let Err(e) = store.record_drop(&event).await {
                    warn!("{}: drop record failed: {:#}", product.name, e);
                    stats.errors += 1;
                }

                stats.alerts_sent += notifier.notify(&event).await;
            }

            // The stored price always advances to the newest observation,
            // drop or not.
            let record = observation_to_record(&product.name, obs);
            if let Err(e) = store.append(&record).await {
                warn!("{}: history write failed: {:#}", product.name, e);
                stats.errors += 1;
            }
        }

        if stats.drops == 0 {
            info!("No price drops detected for tracked products");
        }
        info!(
            "=== Done: {} candidates | {} matched | {} drops | {} alerts | {} errors ===",
            stats.candidates, stats.matched, stats.drops, stats.alerts_sent, stats.errors
        );

        Ok(stats)
    }
}

pub fn catalog_from(config: &AppConfig) -> Vec<TrackedProduct> {
    config
        .catalog
        .products
        .iter()
        .map(|name| TrackedProduct::from_name(name.as_str()))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
