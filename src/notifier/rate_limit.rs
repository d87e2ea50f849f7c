//! Alert ledger: the notifier's private record of what was sent to whom,
//! used to enforce the per-recipient daily cap and per-product cooldown.
//! Entries expire after 24 hours and are pruned lazily on each check.

use crate::models::AlertRecord;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ENTRY_TTL_HOURS: i64 = 24;

pub struct AlertLedger {
    path: PathBuf,
    max_alerts_per_day: usize,
    cooldown: Duration,
    entries: HashMap<String, AlertRecord>,
}

impl AlertLedger {
    /// Missing or corrupt ledger files start empty; alert spacing is
    /// best-effort, never a reason to abort a run.
    pub fn open(path: &Path, max_alerts_per_day: usize, cooldown_hours: i64) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Alert ledger {:?} is corrupt ({}), starting empty", path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            max_alerts_per_day,
            cooldown: Duration::hours(cooldown_hours),
            entries,
        }
    }

    fn key(product_key: &str, recipient: &str) -> String {
        format!("{}::{}", product_key, recipient)
    }

    fn prune(&mut self, now: NaiveDateTime) {
        let ttl = Duration::hours(ENTRY_TTL_HOURS);
        self.entries.retain(|_, rec| now - rec.sent_at < ttl);
    }

    /// Whether another alert to this recipient for this product is allowed.
    pub fn can_send(&mut self, product_key: &str, recipient: &str, now: NaiveDateTime) -> bool {
        self.prune(now);

        let today = self
            .entries
            .values()
            .filter(|rec| rec.recipient == recipient)
            .count();
        if today >= self.max_alerts_per_day {
            debug!("{}: daily alert cap reached ({})", recipient, today);
            return false;
        }

        if let Some(last) = self.entries.get(&Self::key(product_key, recipient)) {
            if now - last.sent_at < self.cooldown {
                debug!("{} × {}: within cooldown", product_key, recipient);
                return false;
            }
        }

        true
    }

    pub fn record(&mut self, product_key: &str, recipient: &str, now: NaiveDateTime) {
        self.entries.insert(
            Self::key(product_key, recipient),
            AlertRecord {
                product_key: product_key.to_string(),
                recipient: recipient.to_string(),
                sent_at: now,
            },
        );
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Could not write {:?}", self.path))?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn ledger() -> AlertLedger {
        let dir = tempfile::tempdir().unwrap();
        AlertLedger::open(&dir.path().join("ledger.json"), 5, 6)
    }

    #[test]
    fn daily_cap_blocks_sixth_alert() {
        let mut ledger = ledger();
        for (i, product) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            assert!(ledger.can_send(product, "ravi@example.com", at(i as u32)));
            ledger.record(product, "ravi@example.com", at(i as u32));
        }
        assert!(!ledger.can_send("f", "ravi@example.com", at(5)));
        // Another recipient is unaffected by the first one's cap.
        assert!(ledger.can_send("f", "meera@example.com", at(5)));
    }

    #[test]
    fn cooldown_blocks_same_product_only() {
        let mut ledger = ledger();
        ledger.record("Maggi Masala instant noodles 9.8 oz", "ravi@example.com", at(9));

        // 2h later: same product is still cooling down, another is fine.
        assert!(!ledger.can_send("Maggi Masala instant noodles 9.8 oz", "ravi@example.com", at(11)));
        assert!(ledger.can_send("Amul Ghee clarified butter", "ravi@example.com", at(11)));

        // 7h later the cooldown has lapsed.
        assert!(ledger.can_send("Maggi Masala instant noodles 9.8 oz", "ravi@example.com", at(16)));
    }

    #[test]
    fn entries_expire_after_a_day() {
        let mut ledger = ledger();
        for product in ["a", "b", "c", "d", "e"] {
            ledger.record(product, "ravi@example.com", at(8));
        }
        assert!(!ledger.can_send("f", "ravi@example.com", at(9)));

        let next_day = at(9) + Duration::hours(24);
        assert!(ledger.can_send("f", "ravi@example.com", next_day));
    }

    #[test]
    fn ledger_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = AlertLedger::open(&path, 5, 6);
        ledger.record("a", "ravi@example.com", at(9));
        ledger.save().unwrap();

        let mut reloaded = AlertLedger::open(&path, 5, 6);
        assert!(!reloaded.can_send("a", "ravi@example.com", at(10)));
    }
}
