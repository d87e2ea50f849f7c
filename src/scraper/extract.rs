use crate::config::ExtractorConfig;
use crate::models::ScrapedObservation;
use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn price_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[$€£¥]\s?[\d,]+\.?\d*").expect("price pattern"))
}

/// Pulls product candidates out of unstable category-page markup.
///
/// Container selectors are tried most-specific-first; the first selector that
/// yields any named items wins and later selectors are not consulted
/// (first-success, not best-of-all). Within an item, name/price/unit each walk
/// their own fallback selector list.
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, html: &str, observed_at: NaiveDateTime) -> Vec<ScrapedObservation> {
        let doc = Html::parse_document(html);
        let mut seen: HashSet<(String, Option<String>)> = HashSet::new();

        for sel_str in &self.config.container_selectors {
            let Ok(selector) = Selector::parse(sel_str) else {
                warn!("Skipping invalid container selector {:?}", sel_str);
                continue;
            };

            let items: Vec<ElementRef> = doc
                .select(&selector)
                .take(self.config.max_items_per_selector)
                .collect();
            if items.is_empty() {
                continue;
            }
            debug!("Selector {:?}: {} candidate containers", sel_str, items.len());

            let mut observations = Vec::new();
            for item in items {
                let Some(obs) = self.extract_item(item, sel_str, observed_at) else {
                    // Neither name nor price: not an error, just noise.
                    continue;
                };
                let key = (obs.name.clone(), obs.price_text.clone());
                if seen.insert(key) {
                    observations.push(obs);
                }
            }

            if !observations.is_empty() {
                debug!("{} unique candidates via {:?}", observations.len(), sel_str);
                return observations;
            }
        }

        Vec::new()
    }

    fn extract_item(
        &self,
        item: ElementRef,
        container: &str,
        observed_at: NaiveDateTime,
    ) -> Option<ScrapedObservation> {
        let name = self.extract_name(item)?;
        let price_text = self.extract_price(item);
        let unit_text = self.first_text(item, &self.config.unit_selectors, 0);

        Some(ScrapedObservation {
            name,
            price_text,
            unit_text,
            source_selector: container.to_string(),
            observed_at,
        })
    }

    fn extract_name(&self, item: ElementRef) -> Option<String> {
        // Min length 3 filters icon glyphs and stray cell text.
        if let Some(name) = self.first_text(item, &self.config.name_selectors, 3) {
            return Some(name);
        }

        // No structured title element: scan free text for a keyword-bearing line.
        let all_text = item.text().collect::<String>();
        for line in all_text.lines() {
            let line = line.trim();
            if line.len() > 10 {
                let lower = line.to_lowercase();
                if self
                    .config
                    .text_fallback_keywords
                    .iter()
                    .any(|k| lower.contains(k.as_str()))
                {
                    return Some(line.to_string());
                }
            }
        }
        None
    }

    fn extract_price(&self, item: ElementRef) -> Option<String> {
        for sel_str in &self.config.price_selectors {
            let Ok(sel) = Selector::parse(sel_str) else {
                continue;
            };
            if let Some(el) = item.select(&sel).next() {
                let text = collapse_ws(&el.text().collect::<String>());
                if text.chars().any(|c| matches!(c, '$' | '€' | '£' | '¥')) {
                    return Some(text);
                }
            }
        }

        // No priced element: look for a price pattern anywhere in the item text.
        let all_text = item.text().collect::<String>();
        price_pattern().find(&all_text).map(|m| m.as_str().to_string())
    }

    fn first_text(&self, item: ElementRef, selectors: &[String], min_len: usize) -> Option<String> {
        for sel_str in selectors {
            let Ok(sel) = Selector::parse(sel_str) else {
                warn!("Skipping invalid selector {:?}", sel_str);
                continue;
            };
            if let Some(el) = item.select(&sel).next() {
                let text = collapse_ws(&el.text().collect::<String>());
                if text.len() > min_len {
                    return Some(text);
                }
            }
        }
        None
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
