use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One probe reading for a product
///
/// `available_units` is a lower bound on true stock once stock exceeds the
/// sentinel quantity the prober requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub name: String,
    pub review_count: u32,
    pub avg_rating: f64,
    pub seller: String,
    pub price: Decimal,
    pub available_units: i64,
}
