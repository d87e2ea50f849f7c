use crate::models::{PriceRecord, ScrapedObservation};
use regex::Regex;
use std::sync::OnceLock;

// ── Price parsing ─────────────────────────────────────────────────────────────

fn numeric_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("numeric run pattern"))
}

/// Parse a human price string into a number, currency-agnostic.
/// "$4.99" → 4.99 | "¥15.99" → 15.99 | "$1,234.56" → 1234.56
///
/// Thousands separators are stripped and the first numeric run wins. Returns
/// None on empty input, no digits, or an unparsable run. Never panics.
pub fn parse_price(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned = s.replace(',', "");
    let run = numeric_run().find(&cleaned)?;
    run.as_str().parse().ok()
}

// ── Observation → record ──────────────────────────────────────────────────────

/// Build the history record for a matched observation. The record is keyed by
/// the canonical tracked name, not the scraped title.
pub fn observation_to_record(product_key: &str, obs: &ScrapedObservation) -> PriceRecord {
    let price_text = obs.price_text.clone().unwrap_or_default();
    PriceRecord {
        product_key: product_key.to_string(),
        price: obs.price_text.as_deref().and_then(parse_price),
        price_text,
        observed_at: obs.observed_at,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_known_formats() {
        assert_eq!(parse_price("$4.99"), Some(4.99));
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price("¥15.99"), Some(15.99));
        assert_eq!(parse_price("610.00"), Some(610.0));
        assert_eq!(parse_price("€3"), Some(3.0));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
        assert_eq!(parse_price("Free"), None);
        assert_eq!(parse_price("N/A"), None);
    }

    #[test]
    fn test_parse_price_takes_first_run() {
        // Multi-price strings resolve to the leading number.
        assert_eq!(parse_price("$3.99 was $4.99"), Some(3.99));
    }

    #[test]
    fn test_observation_to_record() {
        let obs = ScrapedObservation {
            name: "Maggi Masala instant noodles 9.8oz".into(),
            price_text: Some("$3.99".into()),
            unit_text: None,
            source_selector: "article".into(),
            observed_at: chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        };
        let rec = observation_to_record("Maggi Masala instant noodles 9.8 oz", &obs);
        assert_eq!(rec.product_key, "Maggi Masala instant noodles 9.8 oz");
        assert_eq!(rec.price, Some(3.99));
        assert_eq!(rec.price_text, "$3.99");
    }

    #[test]
    fn test_unparsable_price_yields_none() {
        let obs = ScrapedObservation {
            name: "Spinach 1 bunch".into(),
            price_text: Some("Sold out".into()),
            unit_text: None,
            source_selector: "article".into(),
            observed_at: chrono::Utc::now().naive_utc(),
        };
        let rec = observation_to_record("Spinach 1 bunch", &obs);
        assert_eq!(rec.price, None);
        assert_eq!(rec.price_text, "Sold out");
    }
}
