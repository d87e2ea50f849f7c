use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use rand::RngExt;
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS,
};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{FixedInterval, jitter};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// Transport errors and throttling/server statuses are worth another
    /// attempt; other client errors are terminal.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(status) => {
                status.as_u16() == 429 || status.as_u16() == 503 || status.is_server_error()
            }
            FetchError::Transport(_) => true,
        }
    }
}

pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        // Browser-like header set; the storefront serves a reduced page to
        // bare clients.
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text with rate-limiting and bounded retry.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.polite_delay().await;

        let strategy = FixedInterval::from_millis(self.config.retry_delay_ms)
            .map(jitter)
            .take(self.config.max_retries as usize);

        RetryIf::spawn(strategy, || self.fetch_once(url), FetchError::is_retryable)
            .await
            .with_context(|| format!("All attempts exhausted for {}", url))
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let resp = self.inner.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!("GET {} → {}", url, status);
            return Err(FetchError::Status(status));
        }
        Ok(resp.text().await?)
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter_ms = rand::rng().random_range(0..=self.config.jitter_ms);
        let total = Duration::from_millis(self.config.request_delay_ms + jitter_ms);
        sleep(total).await;
    }
}
