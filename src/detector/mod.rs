//! Price-drop detection.
//!
//! Per product the state machine is: no history → first observation stores a
//! price; a later observation strictly below the stored price emits a
//! `DropEvent`; equal or higher observations emit nothing. In every case the
//! caller appends the new observation afterwards so the stored price always
//! reflects the most recent look.

use crate::models::{DropEvent, PriceRecord};

/// Pure comparison of the last stored record against a new price.
/// Records with an unparsable (None) stored price yield no event.
pub fn detect_drop(
    product_key: &str,
    last: Option<&PriceRecord>,
    new_price: f64,
) -> Option<DropEvent> {
    let old_price = last?.price?;
    if new_price < old_price {
        Some(DropEvent::new(product_key, old_price, new_price))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(key: &str, price: Option<f64>) -> PriceRecord {
        PriceRecord {
            product_key: key.to_string(),
            price,
            price_text: price.map(|p| format!("${:.2}", p)).unwrap_or_default(),
            observed_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn strict_decrease_emits_one_event() {
        let last = record("Carrots 2 lb bag", Some(5.00));
        let event = detect_drop("Carrots 2 lb bag", Some(&last), 4.00)
            .expect("drop should be detected");
        assert_eq!(event.old_price, 5.00);
        assert_eq!(event.new_price, 4.00);
        assert_eq!(event.savings_amount, 1.00);
        assert_eq!(event.savings_percentage, 20.0);
    }

    #[test]
    fn equal_or_higher_is_silent() {
        let last = record("Carrots 2 lb bag", Some(5.00));
        assert_eq!(detect_drop("Carrots 2 lb bag", Some(&last), 5.00), None);
        assert_eq!(detect_drop("Carrots 2 lb bag", Some(&last), 6.00), None);
    }

    #[test]
    fn first_observation_is_silent() {
        assert_eq!(detect_drop("Carrots 2 lb bag", None, 4.00), None);
    }

    #[test]
    fn unparsable_history_is_silent() {
        let last = record("Carrots 2 lb bag", None);
        assert_eq!(detect_drop("Carrots 2 lb bag", Some(&last), 4.00), None);
    }
}
