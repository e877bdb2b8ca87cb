//! Dashboard request/response models
//!
//! Shapes consumed by the display layer: product cards, catalog totals,
//! chart series and the fastest movers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::services::sales_aggregator::{ProductSales, SalesPoint, SalesWindow, WindowSums};

/// Query parameters for the dashboard endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardQuery {
    /// Sort window: 24h, 7d, 30d (defaults to 24h)
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_sort() -> String {
    "24h".to_string()
}

impl DashboardQuery {
    pub fn validate(&self) -> Result<SalesWindow, String> {
        self.sort.parse()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub key: String,
    pub url: String,
    pub name: String,
    pub review_count: u32,
    pub avg_rating: f64,
    pub seller: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub available_units: i64,
    #[serde(flatten)]
    pub sales: WindowSums,
    pub series: Vec<SalesPoint>,
}

impl From<&ProductSales> for ProductSummary {
    fn from(p: &ProductSales) -> Self {
        Self {
            key: p.key.clone(),
            url: p.url.clone(),
            name: p.name.clone(),
            review_count: p.review_count,
            avg_rating: p.avg_rating,
            seller: p.seller.clone(),
            price: p.price,
            available_units: p.available_units,
            sales: p.sums,
            series: p.series.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogTotals {
    #[serde(rename = "total24h")]
    pub total_24h: i64,
    #[serde(rename = "total7d")]
    pub total_7d: i64,
    #[serde(rename = "total30d")]
    pub total_30d: i64,
}

impl From<WindowSums> for CatalogTotals {
    fn from(sums: WindowSums) -> Self {
        Self {
            total_24h: sums.sales_24h,
            total_7d: sums.sales_7d,
            total_30d: sums.sales_30d,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub title: String,
    pub keyword: String,
    pub generated_at: DateTime<Utc>,
    pub sort: SalesWindow,
    pub totals: CatalogTotals,
    /// Sorted by the requested window
    pub products: Vec<ProductSummary>,
    /// Fastest movers by 24h sales, independent of `sort`
    pub top_movers: Vec<ProductSummary>,
    pub catalog_series: Vec<SalesPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSeriesResponse {
    pub key: String,
    pub name: String,
    pub series: Vec<SalesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardErrorResponse {
    pub error: String,
    pub code: Option<String>,
}
