// src/bin/probe_products.rs
//
// One probe cycle over the seed list, then exit. For cron-style scheduling.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_tracker::browser::webdriver::WebDriverFactory;
use sales_tracker::config::Config;
use sales_tracker::jobs::stock_probe_sync::run_seeded_cycle;
use sales_tracker::scrapers::prober::StockProber;
use sales_tracker::services::ledger::ObservationLedger;
use sales_tracker::services::seed_list::SeedList;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sales_tracker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let ledger = ObservationLedger::new(&config.data_dir);
    let seeds = SeedList::new(&config.seed_file);
    let sessions = WebDriverFactory::new(config.webdriver_url.clone(), config.headless)?;
    let prober = StockProber::new(Arc::new(sessions), config.probe.clone());

    let stats = run_seeded_cycle(&prober, &ledger, &seeds).await?;

    tracing::info!(
        attempted = stats.attempted,
        recorded = stats.recorded,
        failed = stats.failed,
        "Probe run finished"
    );

    Ok(())
}
