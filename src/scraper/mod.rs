pub mod cleaner;
pub mod extract;
pub mod http_client;

use crate::config::{ExtractorConfig, ScraperConfig};
use crate::models::ScrapedObservation;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use url::Url;

use self::extract::Extractor;
use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable observation source abstraction.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn fetch_observations(&self) -> Result<Vec<ScrapedObservation>>;
}

// ── Category page scraper ─────────────────────────────────────────────────────

/// Fetches the configured category page and extracts product candidates.
pub struct CategoryScraper {
    client: HttpClient,
    extractor: Extractor,
    category_url: Url,
}

impl CategoryScraper {
    pub fn new(scraper: &ScraperConfig, extractor: &ExtractorConfig) -> Result<Self> {
        let category_url = Url::parse(&scraper.category_url)
            .with_context(|| format!("Invalid category URL {:?}", scraper.category_url))?;

        Ok(Self {
            client: HttpClient::new(scraper)?,
            extractor: Extractor::new(extractor.clone()),
            category_url,
        })
    }
}

#[async_trait]
impl ObservationSource for CategoryScraper {
    async fn fetch_observations(&self) -> Result<Vec<ScrapedObservation>> {
        info!("Fetching category page {}", self.category_url);

        let html = self
            .client
            .get_text(self.category_url.as_str())
            .await
            .context("Failed to fetch category page")?;
        debug!("Fetched {} bytes of markup", html.len());

        let observations = self.extractor.extract(&html, Utc::now().naive_utc());
        info!("{} unique product candidates extracted", observations.len());
        Ok(observations)
    }
}
