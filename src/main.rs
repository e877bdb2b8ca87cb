use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_tracker::browser::webdriver::WebDriverFactory;
use sales_tracker::config::Config;
use sales_tracker::jobs::stock_probe_sync::start_stock_probe_job;
use sales_tracker::scrapers::prober::StockProber;
use sales_tracker::services::ledger::ObservationLedger;
use sales_tracker::services::seed_list::SeedList;
use sales_tracker::{handlers, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sales_tracker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(keyword = %config.keyword, data_dir = %config.data_dir.display(), "Loaded configuration");

    let ledger = ObservationLedger::new(&config.data_dir);
    let seeds = SeedList::new(&config.seed_file);

    let sessions = WebDriverFactory::new(config.webdriver_url.clone(), config.headless)?;
    let prober = Arc::new(StockProber::new(Arc::new(sessions), config.probe.clone()));

    start_stock_probe_job(prober, ledger.clone(), seeds, config.probe_interval).await;

    let state = AppState {
        ledger,
        keyword: config.keyword.clone(),
        title: config.dashboard_title(),
    };

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Dashboard API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
