use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Tracked product ───────────────────────────────────────────────────────────

/// One entry of the fixed catalog of monitored items. Loaded once at startup;
/// never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedProduct {
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
}

impl TrackedProduct {
    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brand: None,
            category: None,
            unit: None,
        }
    }
}

// ── Scraped observation ───────────────────────────────────────────────────────

/// One (name, price) candidate produced in a single extraction pass.
/// May or may not correspond to a tracked product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedObservation {
    pub name: String,
    pub price_text: Option<String>,
    pub unit_text: Option<String>,
    /// The container selector that yielded this item.
    pub source_selector: String,
    pub observed_at: NaiveDateTime,
}

// ── Price record ──────────────────────────────────────────────────────────────

/// One stored price point, keyed by the canonical tracked name.
/// `price` is None only when the source text was unparsable; never negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    pub product_key: String,
    pub price: Option<f64>,
    pub price_text: String,
    pub observed_at: NaiveDateTime,
}

// ── Drop event ────────────────────────────────────────────────────────────────

/// A detected strict decrease against the last stored price.
/// Ephemeral: lives only for the notification step of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub product_key: String,
    pub old_price: f64,
    pub new_price: f64,
    pub savings_amount: f64,
    pub savings_percentage: f64,
}

impl DropEvent {
    /// Caller guarantees `new_price < old_price`.
    pub fn new(product_key: impl Into<String>, old_price: f64, new_price: f64) -> Self {
        let savings_amount = old_price - new_price;
        Self {
            product_key: product_key.into(),
            old_price,
            new_price,
            savings_amount,
            savings_percentage: savings_amount / old_price * 100.0,
        }
    }
}

// ── Recipients ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFrequency {
    Immediate,
    Daily,
    Weekly,
}

impl AlertFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::Immediate => "immediate",
            AlertFrequency::Daily => "daily",
            AlertFrequency::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertPreferences {
    /// Minimum absolute savings before an alert qualifies.
    #[serde(default)]
    pub minimum_savings: f64,
    /// Minimum percentage drop before an alert qualifies.
    #[serde(default)]
    pub minimum_percentage: f64,
    #[serde(default = "default_frequency")]
    pub alert_frequency: AlertFrequency,
}

fn default_frequency() -> AlertFrequency {
    AlertFrequency::Immediate
}

impl Default for AlertPreferences {
    fn default() -> Self {
        Self {
            minimum_savings: 0.0,
            minimum_percentage: 0.0,
            alert_frequency: AlertFrequency::Immediate,
        }
    }
}

/// Alert subscriber. Edited out-of-band (config file), read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub email: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub preferences: AlertPreferences,
}

fn default_enabled() -> bool {
    true
}

// ── Alert record ──────────────────────────────────────────────────────────────

/// One sent alert. Owned and mutated exclusively by the notifier's ledger;
/// exists only to enforce daily caps and per-product cooldowns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRecord {
    pub product_key: String,
    pub recipient: String,
    pub sent_at: NaiveDateTime,
}

// ── Store statistics ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub products: usize,
    pub records: usize,
    pub first_observed: Option<NaiveDateTime>,
    pub last_observed: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_event_savings() {
        let e = DropEvent::new("Maggi Masala Instant Noodles 9.8 oz", 5.00, 4.00);
        assert_eq!(e.savings_amount, 1.00);
        assert_eq!(e.savings_percentage, 20.0);
    }
}
