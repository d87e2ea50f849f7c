//! CSV importer for bulk-loading previously exported price rows back into the
//! history store.

use crate::models::PriceRecord;
use crate::scraper::cleaner::parse_price;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{info, warn};

/// Parse an export CSV: Product Name, Price, Unit, Brand, Category,
/// Timestamp, Source. Malformed rows are skipped, not fatal.
pub fn load_csv(path: &Path) -> Result<Vec<PriceRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Could not open {:?}", path))?;

    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };

        let Some(name) = row.get(0).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(observed_at) = row.get(5).and_then(parse_timestamp) else {
            warn!("Row {} ({}): unparsable timestamp, skipping", i + 1, name);
            continue;
        };

        let price_text = row.get(1).unwrap_or("").trim().to_string();
        records.push(PriceRecord {
            product_key: name.to_string(),
            price: parse_price(&price_text),
            price_text,
            observed_at,
        });
    }

    info!("{:?}: {} price records loaded", path, records.len());
    Ok(records)
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_exported_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Product Name,Price,Unit,Brand,Category,Timestamp,Source").unwrap();
        writeln!(file, "Spinach 1 bunch,$2.49,,,,2025-06-01T09:30:00,article").unwrap();
        writeln!(file, "Opo squash 1 pc,N/A,,,,2025-06-01T09:30:00,article").unwrap();
        writeln!(file, "Broken row,,,,,not-a-date,article").unwrap();
        drop(file);

        let records = load_csv(&path).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].product_key, "Spinach 1 bunch");
        assert_eq!(records[0].price, Some(2.49));
        assert_eq!(records[0].price_text, "$2.49");

        // A price that never parsed still imports, priceless.
        assert_eq!(records[1].price, None);
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2025-06-01T09:30:00").is_some());
        assert!(parse_timestamp("2025-06-01T09:30:00.123456").is_some());
        assert!(parse_timestamp("2025-06-01 09:30:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
