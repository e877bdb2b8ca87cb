// src/lib.rs

use services::ledger::ObservationLedger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: ObservationLedger,
    pub keyword: String,
    pub title: String,
}

pub mod services {
    pub mod ledger;
    pub mod sales_aggregator;
    pub mod seed_list;
}

pub mod browser;
pub mod config;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod scrapers;
