mod config;
mod detector;
mod export;
mod loader;
mod matcher;
mod models;
mod notifier;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "price-tracker", about = "Grocery price-drop tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scrape → match → detect → notify pass
    Run,

    /// Show stored price history for one tracked product
    Trend {
        /// Tracked product name (the exact catalog entry)
        product: String,

        /// Look-back window in days
        #[arg(short, long, default_value_t = 30)]
        days: i64,
    },

    /// List configured alert recipients and their preferences
    Recipients,

    /// Show history store statistics
    Stats,

    /// Bulk-import a previously exported CSV into the history store
    ImportCsv {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "price_tracker=info,warn",
        1 => "price_tracker=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Run => {
            let _t = utils::Timer::start("Price tracking pass");
            let stats = Pipeline::new(config).run().await?;
            info!(
                "Done: {} candidates, {} matched, {} drops, {} alerts, {} errors",
                stats.candidates, stats.matched, stats.drops, stats.alerts_sent, stats.errors
            );
        }

        Command::Trend { product, days } => {
            let store = storage::open_store(&config.storage).await?;
            let since = chrono::Utc::now().naive_utc() - chrono::Duration::days(days);
            let trend = store.get_trend(&product, since, days as usize).await?;

            if trend.is_empty() {
                println!("No stored prices for {:?} in the last {} days.", product, days);
            } else {
                println!("{} — last {} days:", product, days);
                for record in &trend {
                    println!(
                        "  {}  {:>10}  {}",
                        record.observed_at.format("%Y-%m-%d %H:%M"),
                        utils::fmt_price(record.price),
                        record.price_text,
                    );
                }
            }
        }

        Command::Recipients => {
            if config.alerts.recipients.is_empty() {
                println!("No recipients configured — add [[alerts.recipients]] to config/local.toml.");
            } else {
                println!("{} recipient(s):", config.alerts.recipients.len());
                for r in &config.alerts.recipients {
                    println!(
                        "  {} <{}>  [{}]  min ${:.2} / {:.1}%  ({})",
                        r.name,
                        r.email,
                        if r.enabled { "enabled" } else { "disabled" },
                        r.preferences.minimum_savings,
                        r.preferences.minimum_percentage,
                        r.preferences.alert_frequency.as_str(),
                    );
                }
            }
        }

        Command::Stats => {
            let store = storage::open_store(&config.storage).await?;
            let stats = store.stats().await?;
            println!("─────────────────────────────────");
            println!("  Price Tracker — Store Stats");
            println!("─────────────────────────────────");
            println!("  Products : {}", stats.products);
            println!("  Records  : {}", stats.records);
            println!(
                "  From     : {}",
                stats.first_observed.map(|d| d.to_string()).unwrap_or("—".into())
            );
            println!(
                "  To       : {}",
                stats.last_observed.map(|d| d.to_string()).unwrap_or("—".into())
            );
            println!("─────────────────────────────────");
        }

        Command::ImportCsv { file } => {
            let _t = utils::Timer::start("CSV bulk import");
            let store = storage::open_store(&config.storage).await?;
            let records = loader::load_csv(&file)?;

            let mut imported = 0usize;
            let mut errors = 0usize;
            for record in &records {
                match store.append(record).await {
                    Ok(()) => imported += 1,
                    Err(e) => {
                        error!("{}: {:#}", record.product_key, e);
                        errors += 1;
                    }
                }
            }

            info!("Done: {} records imported, {} errors", imported, errors);
        }
    }

    Ok(())
}
