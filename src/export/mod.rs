//! Append-only CSV export of matched observations. The header row is written
//! only when the file does not exist yet.

use crate::models::{ScrapedObservation, TrackedProduct};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

pub const CSV_HEADER: [&str; 7] = [
    "Product Name",
    "Price",
    "Unit",
    "Brand",
    "Category",
    "Timestamp",
    "Source",
];

pub fn append_observations(
    path: &Path,
    rows: &[(TrackedProduct, ScrapedObservation)],
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }

    let write_header = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open {:?}", path))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if write_header {
        writer.write_record(CSV_HEADER)?;
    }

    for (product, obs) in rows {
        let timestamp = obs.observed_at.format("%Y-%m-%dT%H:%M:%S").to_string();
        writer.write_record([
            obs.name.as_str(),
            obs.price_text.as_deref().unwrap_or("N/A"),
            obs.unit_text.as_deref().unwrap_or(""),
            product.brand.as_deref().unwrap_or(""),
            product.category.as_deref().unwrap_or(""),
            timestamp.as_str(),
            obs.source_selector.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(name: &str, price: Option<&str>) -> (TrackedProduct, ScrapedObservation) {
        (
            TrackedProduct::from_name(name),
            ScrapedObservation {
                name: name.to_string(),
                price_text: price.map(str::to_string),
                unit_text: None,
                source_selector: "article".to_string(),
                observed_at: NaiveDate::from_ymd_opt(2025, 6, 1)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap(),
            },
        )
    }

    #[test]
    fn header_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");

        append_observations(&path, &[row("Spinach 1 bunch", Some("$2.49"))]).unwrap();
        append_observations(&path, &[row("Mint 1 bunch", Some("$1.29"))]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Product Name,Price"));
        assert!(lines[1].contains("$2.49"));
        assert!(lines[2].contains("$1.29"));
    }

    #[test]
    fn unparsable_price_exports_as_na() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");

        append_observations(&path, &[row("Opo squash 1 pc", None)]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().nth(1).unwrap().contains("N/A"));
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        assert_eq!(append_observations(&path, &[]).unwrap(), 0);
        assert!(!path.exists());
    }
}
