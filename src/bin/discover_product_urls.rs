// src/bin/discover_product_urls.rs
//
// Usage: cargo run --bin discover_product_urls -- [min_count]

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_tracker::browser::webdriver::WebDriverFactory;
use sales_tracker::config::Config;
use sales_tracker::scrapers::discovery::{merge_urls, UrlDiscovery};
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

    let args: Vec<String> = env::args().collect();
    let min_count = match args.get(1) {
        Some(arg) => arg.parse().map_err(|_| {
            eprintln!("Usage: {} [min_count]", args[0]);
            format!("Invalid min_count: {}", arg)
        })?,
        None => config.discovery_min_urls,
    };

    let seeds = SeedList::new(&config.seed_file);
    let existing = seeds.load()?;
    if existing.len() >= min_count {
        tracing::info!(
            stored = existing.len(),
            min_count = min_count,
            "Seed list already meets target, skipping discovery"
        );
        return Ok(());
    }

    let sessions = WebDriverFactory::new(config.webdriver_url.clone(), config.headless)?;
    let discovery = UrlDiscovery::new(
        Arc::new(sessions),
        &config.site_url,
        config.probe.settle_delay.max(Duration::from_secs(1)),
    )?;

    tracing::info!(query = %config.keyword, min_count = min_count, "Discovering product URLs");
    let discovered = discovery.discover(&config.keyword, min_count).await?;

    let merged = merge_urls(&existing, &discovered);
    seeds.save(&merged)?;

    tracing::info!(
        discovered = discovered.len(),
        added = merged.len() - existing.len(),
        total = merged.len(),
        path = %seeds.path().display(),
        "Saved seed list"
    );

    Ok(())
}
