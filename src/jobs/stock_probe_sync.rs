//! Stock probe job
//!
//! Probes every seeded product once per cycle, one at a time, and appends
//! each successful reading to that product's ledger. A failed probe only
//! skips its product; the next cycle retries it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::scrapers::prober::StockProber;
use crate::services::ledger::{ledger_key, ObservationLedger};
use crate::services::seed_list::SeedList;

/// Outcome counts for one pass over the seed list
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub attempted: usize,
    pub recorded: usize,
    pub failed: usize,
}

/// Probe `urls` sequentially and record every successful reading
pub async fn run_probe_cycle(
    prober: &StockProber,
    ledger: &ObservationLedger,
    urls: &[String],
) -> CycleStats {
    let mut stats = CycleStats::default();

    for url in urls {
        stats.attempted += 1;

        let observation = match prober.probe(url).await {
            Ok(observation) => observation,
            Err(e) => {
                warn!(url = %url, kind = e.kind(), step = %e.step(), error = %e, "Probe failed, skipping product this cycle");
                stats.failed += 1;
                continue;
            }
        };

        let key = ledger_key(url);
        let writer = ledger.clone();
        let appended =
            tokio::task::spawn_blocking(move || writer.append(&key, &observation)).await;

        match appended {
            Ok(Ok(row)) => {
                info!(
                    url = %url,
                    available_units = row.available_units,
                    units_sold = ?row.units_sold,
                    "Recorded observation"
                );
                stats.recorded += 1;
            }
            Ok(Err(e)) => {
                error!(url = %url, kind = "LedgerIOError", error = %e, "Failed to append observation");
                stats.failed += 1;
            }
            Err(e) => {
                error!(url = %url, error = %e, "Ledger write task panicked");
                stats.failed += 1;
            }
        }
    }

    info!(
        attempted = stats.attempted,
        recorded = stats.recorded,
        failed = stats.failed,
        "Probe cycle complete"
    );

    stats
}

/// Load the seed list and run one cycle over it
pub async fn run_seeded_cycle(
    prober: &StockProber,
    ledger: &ObservationLedger,
    seeds: &SeedList,
) -> Result<CycleStats, Box<dyn std::error::Error + Send + Sync>> {
    let urls = seeds.load()?;
    if urls.is_empty() {
        warn!(path = %seeds.path().display(), "Seed list is empty, nothing to probe");
    }
    Ok(run_probe_cycle(prober, ledger, &urls).await)
}

/// Start the recurring probe job
///
/// Runs a cycle immediately and then every `every`, reloading the seed list
/// each time, until Ctrl-C.
pub async fn start_stock_probe_job(
    prober: Arc<StockProber>,
    ledger: ObservationLedger,
    seeds: SeedList,
    every: Duration,
) {
    tokio::spawn(async move {
        let shutdown = async {
            tokio::signal::ctrl_c().await.ok();
        };
        run_stock_probe_job(prober, ledger, seeds, every, shutdown).await;
    });
}

/// Scheduled probe loop, stopped by `shutdown`
///
/// `shutdown` is polled during a cycle too; an in-flight cycle is dropped
/// when it fires.
pub async fn run_stock_probe_job<S>(
    prober: Arc<StockProber>,
    ledger: ObservationLedger,
    seeds: SeedList,
    every: Duration,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    info!(interval_secs = every.as_secs(), "Stock probe job started");
    let mut interval = interval(every);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping stock probe job");
                break;
            }
            _ = interval.tick() => {
                info!("Starting scheduled probe cycle");
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("Shutdown signal received mid-cycle, stopping stock probe job");
                        break;
                    }
                    result = run_seeded_cycle(&prober, &ledger, &seeds) => {
                        if let Err(e) = result {
                            error!(error = %e, "Probe cycle could not start");
                        }
                    }
                }
            }
        }
    }

    info!("Stock probe job stopped");
}
