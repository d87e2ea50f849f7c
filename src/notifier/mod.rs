//! Alert dispatch: console always, email per enabled recipient, with
//! preference thresholds and rate-limiting in front of every send.

pub mod email;
pub mod rate_limit;

use crate::config::AppConfig;
use crate::models::{AlertFrequency, DropEvent, Recipient};
use chrono::Utc;
use tracing::{debug, info, warn};

use self::email::Mailer;
use self::rate_limit::AlertLedger;

pub struct Notifier {
    recipients: Vec<Recipient>,
    mailer: Option<Mailer>,
    ledger: AlertLedger,
}

impl Notifier {
    /// A broken mail configuration degrades to console-only alerts rather
    /// than failing the run.
    pub fn new(config: &AppConfig) -> Self {
        let mailer = if config.email.enabled && !config.email.sender_email.is_empty() {
            match Mailer::from_config(
                &config.email,
                &config.alerts,
                Some(config.scraper.category_url.clone()),
            ) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("Email transport unavailable: {:#}", e);
                    None
                }
            }
        } else {
            debug!("Email alerts disabled");
            None
        };

        Self {
            recipients: config.alerts.recipients.clone(),
            mailer,
            ledger: AlertLedger::open(
                &config.alerts.ledger_path,
                config.alerts.max_alerts_per_day,
                config.alerts.cooldown_hours,
            ),
        }
    }

    /// Dispatch one drop event. Returns how many recipients were alerted.
    pub async fn notify(&mut self, event: &DropEvent) -> usize {
        console_alert(event);

        let now = Utc::now().naive_utc();
        let mut sent = 0usize;

        for recipient in self.recipients.iter().filter(|r| r.enabled) {
            if recipient.preferences.alert_frequency != AlertFrequency::Immediate {
                // Digest delivery is scheduled out-of-band, like every other
                // periodic concern here.
                debug!(
                    "{}: {} digest recipient, skipping immediate alert",
                    recipient.name,
                    recipient.preferences.alert_frequency.as_str()
                );
                continue;
            }

            let prefs = &recipient.preferences;
            if event.savings_amount < prefs.minimum_savings
                || event.savings_percentage < prefs.minimum_percentage
            {
                debug!(
                    "{}: below thresholds (${:.2} / {:.1}%)",
                    recipient.name, prefs.minimum_savings, prefs.minimum_percentage
                );
                continue;
            }

            if !self.ledger.can_send(&event.product_key, &recipient.email, now) {
                info!("Skipping alert to {} (cooldown/limit)", recipient.name);
                continue;
            }

            if let Some(mailer) = &self.mailer {
                // One recipient's transport failure never blocks the rest.
                if let Err(e) = mailer.send_drop_alert(recipient, event).await {
                    warn!("Failed to send email to {}: {:#}", recipient.name, e);
                    continue;
                }
                info!("Email sent to {} ({})", recipient.name, recipient.email);
            }

            self.ledger.record(&event.product_key, &recipient.email, now);
            sent += 1;
        }

        if sent > 0 {
            if let Err(e) = self.ledger.save() {
                warn!("Could not persist alert ledger: {:#}", e);
            }
            info!("Sent {} alert(s) for {}", sent, event.product_key);
        }

        sent
    }
}

fn console_alert(event: &DropEvent) {
    println!("🚨 PRICE DROP ALERT!");
    println!("Product: {}", event.product_key);
    println!("Old Price: ${:.2}", event.old_price);
    println!("New Price: ${:.2}", event.new_price);
    println!(
        "Savings: ${:.2} ({:.1}% off)",
        event.savings_amount, event.savings_percentage
    );
    println!("{}", "-".repeat(50));
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::AlertPreferences;

    fn recipient(email: &str, min_savings: f64, min_pct: f64) -> Recipient {
        Recipient {
            email: email.to_string(),
            name: email.split('@').next().unwrap_or("someone").to_string(),
            enabled: true,
            preferences: AlertPreferences {
                minimum_savings: min_savings,
                minimum_percentage: min_pct,
                alert_frequency: AlertFrequency::Immediate,
            },
        }
    }

    fn notifier_with(recipients: Vec<Recipient>) -> (Notifier, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.alerts.ledger_path = dir.path().join("ledger.json");
        config.alerts.recipients = recipients;
        (Notifier::new(&config), dir)
    }

    #[tokio::test]
    async fn qualifying_recipients_are_counted() {
        let (mut notifier, _dir) = notifier_with(vec![
            recipient("ravi@example.com", 0.50, 5.0),
            recipient("meera@example.com", 0.50, 5.0),
        ]);
        let event = DropEvent::new("Amul Ghee clarified butter", 12.99, 10.99);
        assert_eq!(notifier.notify(&event).await, 2);
    }

    #[tokio::test]
    async fn threshold_filtering_per_recipient() {
        let (mut notifier, _dir) = notifier_with(vec![
            recipient("frugal@example.com", 5.00, 0.0),
            recipient("eager@example.com", 0.10, 0.0),
        ]);
        let event = DropEvent::new("Spinach 1 bunch", 2.49, 1.99);
        // $0.50 savings only clears the second recipient's bar.
        assert_eq!(notifier.notify(&event).await, 1);
    }

    #[tokio::test]
    async fn disabled_and_digest_recipients_are_skipped() {
        let mut disabled = recipient("off@example.com", 0.0, 0.0);
        disabled.enabled = false;
        let mut weekly = recipient("weekly@example.com", 0.0, 0.0);
        weekly.preferences.alert_frequency = AlertFrequency::Weekly;

        let (mut notifier, _dir) = notifier_with(vec![disabled, weekly]);
        let event = DropEvent::new("Mint 1 bunch", 1.49, 0.99);
        assert_eq!(notifier.notify(&event).await, 0);
    }

    #[tokio::test]
    async fn cooldown_suppresses_repeat_alerts() {
        let (mut notifier, _dir) = notifier_with(vec![recipient("ravi@example.com", 0.0, 0.0)]);

        let first = DropEvent::new("Carrots 2 lb bag", 3.99, 3.49);
        assert_eq!(notifier.notify(&first).await, 1);

        // Same product again within the cooldown window: suppressed.
        let second = DropEvent::new("Carrots 2 lb bag", 3.49, 2.99);
        assert_eq!(notifier.notify(&second).await, 0);

        // A different product is still deliverable.
        let other = DropEvent::new("Cilantro 1 bunch", 1.29, 0.99);
        assert_eq!(notifier.notify(&other).await, 1);
    }
}
