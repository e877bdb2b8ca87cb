//! Rolling-window sales aggregation
//!
//! Pure functions over loaded ledgers. Only rows with a positive `UnitsSold`
//! count as sales: the first observation of a ledger has none, and negative
//! deltas (restocks, gaps) are skipped rather than netted off.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::ledger::{LedgerRow, ProductLedger};

/// Trailing windows ending at the evaluation instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SalesWindow {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl SalesWindow {
    pub const ALL: [SalesWindow; 3] = [SalesWindow::Day, SalesWindow::Week, SalesWindow::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            SalesWindow::Day => "24h",
            SalesWindow::Week => "7d",
            SalesWindow::Month => "30d",
        }
    }

    pub fn length(&self) -> Duration {
        match self {
            SalesWindow::Day => Duration::hours(24),
            SalesWindow::Week => Duration::days(7),
            SalesWindow::Month => Duration::days(30),
        }
    }

    fn contains(&self, now: DateTime<Utc>, timestamp: DateTime<Utc>) -> bool {
        timestamp >= now - self.length() && timestamp <= now
    }
}

impl FromStr for SalesWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(SalesWindow::Day),
            "7d" => Ok(SalesWindow::Week),
            "30d" => Ok(SalesWindow::Month),
            _ => Err(format!("Invalid sort: '{}'. Must be one of: 24h, 7d, 30d", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowSums {
    #[serde(rename = "sales24h")]
    pub sales_24h: i64,
    #[serde(rename = "sales7d")]
    pub sales_7d: i64,
    #[serde(rename = "sales30d")]
    pub sales_30d: i64,
}

impl WindowSums {
    pub fn get(&self, window: SalesWindow) -> i64 {
        match window {
            SalesWindow::Day => self.sales_24h,
            SalesWindow::Week => self.sales_7d,
            SalesWindow::Month => self.sales_30d,
        }
    }

    fn add(&mut self, window: SalesWindow, units: i64) {
        match window {
            SalesWindow::Day => self.sales_24h += units,
            SalesWindow::Week => self.sales_7d += units,
            SalesWindow::Month => self.sales_30d += units,
        }
    }

    fn accumulate(&mut self, other: &WindowSums) {
        self.sales_24h += other.sales_24h;
        self.sales_7d += other.sales_7d;
        self.sales_30d += other.sales_30d;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPoint {
    pub timestamp: DateTime<Utc>,
    pub units_sold: i64,
}

/// Per-product view: latest attributes plus window sums
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    pub key: String,
    pub url: String,
    pub name: String,
    pub review_count: u32,
    pub avg_rating: f64,
    pub seller: String,
    pub price: Decimal,
    pub available_units: i64,
    pub sums: WindowSums,
    /// Positive sales, oldest first
    pub series: Vec<SalesPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSales {
    pub generated_at: DateTime<Utc>,
    /// In the order the ledgers were supplied
    pub products: Vec<ProductSales>,
    pub totals: WindowSums,
    /// Sum of all products' sales per timestamp, oldest first
    pub series: Vec<SalesPoint>,
}

impl CatalogSales {
    pub fn product(&self, key: &str) -> Option<&ProductSales> {
        self.products.iter().find(|p| p.key == key)
    }
}

fn positive_sales(rows: &[LedgerRow]) -> impl Iterator<Item = (DateTime<Utc>, i64)> + '_ {
    rows.iter().filter_map(|row| match row.units_sold {
        Some(units) if units > 0 => Some((row.timestamp(), units)),
        _ => None,
    })
}

/// Window sums of positive sales in `[now - window, now]`
pub fn window_sums(rows: &[LedgerRow], now: DateTime<Utc>) -> WindowSums {
    let mut sums = WindowSums::default();
    for (timestamp, units) in positive_sales(rows) {
        for window in SalesWindow::ALL {
            if window.contains(now, timestamp) {
                sums.add(window, units);
            }
        }
    }
    sums
}

/// Aggregate every ledger at `now`; ledgers with no rows are left out
pub fn aggregate(ledgers: &[ProductLedger], now: DateTime<Utc>) -> CatalogSales {
    let mut products = Vec::with_capacity(ledgers.len());
    let mut totals = WindowSums::default();
    let mut by_timestamp: BTreeMap<DateTime<Utc>, i64> = BTreeMap::new();

    for ledger in ledgers {
        let Some(latest) = ledger.latest() else {
            continue;
        };

        let sums = window_sums(&ledger.rows, now);
        totals.accumulate(&sums);

        let series: Vec<SalesPoint> = positive_sales(&ledger.rows)
            .map(|(timestamp, units_sold)| SalesPoint { timestamp, units_sold })
            .collect();
        for point in &series {
            *by_timestamp.entry(point.timestamp).or_default() += point.units_sold;
        }

        products.push(ProductSales {
            key: ledger.key.clone(),
            url: latest.url.clone(),
            name: latest.product_name.clone(),
            review_count: latest.review_count,
            avg_rating: latest.avg_rating,
            seller: latest.seller.clone(),
            price: latest.price,
            available_units: latest.available_units,
            sums,
            series,
        });
    }

    let series = by_timestamp
        .into_iter()
        .map(|(timestamp, units_sold)| SalesPoint { timestamp, units_sold })
        .collect();

    CatalogSales {
        generated_at: now,
        products,
        totals,
        series,
    }
}

/// Products sorted descending by the chosen window; equal sums keep input order
pub fn rank_by(products: &[ProductSales], window: SalesWindow) -> Vec<&ProductSales> {
    let mut ranked: Vec<&ProductSales> = products.iter().collect();
    ranked.sort_by(|a, b| b.sums.get(window).cmp(&a.sums.get(window)));
    ranked
}

/// The `n` fastest movers, always ranked by 24-hour sales
pub fn top_movers(products: &[ProductSales], n: usize) -> Vec<&ProductSales> {
    let mut ranked = rank_by(products, SalesWindow::Day);
    ranked.truncate(n);
    ranked
}
