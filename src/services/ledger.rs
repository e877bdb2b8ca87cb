//! Observation ledger
//!
//! One append-only CSV table per product under `{data_dir}/ledgers/v1/`,
//! named by the SHA-256 of the product URL. Every append loads the whole
//! table, derives `UnitsSold` against the previous row, and replaces the file
//! through a temp-file rename so a failed write leaves the old table intact.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::observation::Observation;

/// On-disk layout version; part of the ledger directory path
pub const LEDGER_SCHEMA_VERSION: &str = "v1";

pub const LEDGER_COLUMNS: [&str; 10] = [
    "Date",
    "Time",
    "URL",
    "ProductName",
    "ReviewCount",
    "AverageRating",
    "Seller",
    "Price",
    "AvailableUnits",
    "UnitsSold",
];

const LEDGER_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger {path} is malformed: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("ledger {path} has unexpected columns: {found}")]
    SchemaMismatch { path: PathBuf, found: String },

    #[error("observation at {observed} is older than last ledger row at {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        observed: DateTime<Utc>,
    },

    #[error("failed to replace ledger {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A stored ledger row
///
/// `units_sold` is `None` for the first row of a ledger and may be negative
/// after a restock; it is stored exactly as derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time")]
    pub time: NaiveTime,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "ProductName")]
    pub product_name: String,
    #[serde(rename = "ReviewCount")]
    pub review_count: u32,
    #[serde(rename = "AverageRating")]
    pub avg_rating: f64,
    #[serde(rename = "Seller")]
    pub seller: String,
    #[serde(rename = "Price", with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(rename = "AvailableUnits")]
    pub available_units: i64,
    #[serde(rename = "UnitsSold")]
    pub units_sold: Option<i64>,
}

impl LedgerRow {
    pub fn from_observation(observation: &Observation, units_sold: Option<i64>) -> Self {
        Self {
            date: observation.timestamp.date_naive(),
            time: observation.timestamp.time(),
            url: observation.url.clone(),
            product_name: observation.name.clone(),
            review_count: observation.review_count,
            avg_rating: observation.avg_rating,
            seller: observation.seller.clone(),
            price: observation.price,
            available_units: observation.available_units,
            units_sold,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }
}

/// All rows of one product's ledger
#[derive(Debug, Clone, PartialEq)]
pub struct ProductLedger {
    pub key: String,
    pub rows: Vec<LedgerRow>,
}

impl ProductLedger {
    pub fn latest(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }
}

/// Stable, file-safe ledger identifier for a product URL
pub fn ledger_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// `prior - current` when a prior reading exists
pub fn units_sold(prior_available: Option<i64>, current_available: i64) -> Option<i64> {
    prior_available.map(|prior| prior - current_available)
}

#[derive(Debug, Clone)]
pub struct ObservationLedger {
    dir: PathBuf,
}

impl ObservationLedger {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir
                .as_ref()
                .join("ledgers")
                .join(LEDGER_SCHEMA_VERSION),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, LEDGER_EXTENSION))
    }

    /// Append an observation, deriving its `UnitsSold` from the last stored row
    ///
    /// Single writer per key: concurrent appends to the same ledger are not
    /// serialised here.
    pub fn append(&self, key: &str, observation: &Observation) -> Result<LedgerRow, LedgerError> {
        let path = self.path_for(key);
        let mut rows = self.load(key)?;

        let timestamp = observation.timestamp;
        if let Some(last) = rows.last() {
            if timestamp < last.timestamp() {
                return Err(LedgerError::OutOfOrder {
                    last: last.timestamp(),
                    observed: timestamp,
                });
            }
        }

        let prior = rows.last().map(|r| r.available_units);
        let row = LedgerRow::from_observation(observation, units_sold(prior, observation.available_units));
        rows.push(row.clone());

        self.store(&path, &rows)?;

        debug!(
            key = %key,
            rows = rows.len(),
            units_sold = ?row.units_sold,
            "Appended ledger row"
        );

        Ok(row)
    }

    pub fn last_available_units(&self, key: &str) -> Result<Option<i64>, LedgerError> {
        Ok(self.load(key)?.last().map(|r| r.available_units))
    }

    /// Load one ledger; an absent file is an empty ledger
    pub fn load(&self, key: &str) -> Result<Vec<LedgerRow>, LedgerError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_rows(&path)
    }

    /// Every stored ledger, in first-seen order
    ///
    /// Ordered by first observation timestamp, ties by key; empty ledgers last.
    /// A ledger that cannot be read is logged and left out.
    pub fn load_all(&self) -> Result<Vec<ProductLedger>, LedgerError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|source| LedgerError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut ledgers = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| LedgerError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();

            if !path.is_file()
                || path.extension().and_then(|s| s.to_str()) != Some(LEDGER_EXTENSION)
            {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            match read_rows(&path) {
                Ok(rows) => ledgers.push(ProductLedger { key, rows }),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable ledger"),
            }
        }

        ledgers.sort_by(|a, b| {
            let first_a = a.rows.first().map(LedgerRow::timestamp);
            let first_b = b.rows.first().map(LedgerRow::timestamp);
            match (first_a, first_b) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.key.cmp(&b.key)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.key.cmp(&b.key),
            }
        });

        Ok(ledgers)
    }

    fn store(&self, path: &Path, rows: &[LedgerRow]) -> Result<(), LedgerError> {
        fs::create_dir_all(&self.dir).map_err(|source| LedgerError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let tmp = NamedTempFile::new_in(&self.dir).map_err(|source| LedgerError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut writer = csv::Writer::from_writer(tmp);
        for row in rows {
            writer.serialize(row).map_err(|source| LedgerError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let tmp = writer.into_inner().map_err(|e| LedgerError::Io {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;
        tmp.as_file().sync_all().map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tmp.persist(path).map_err(|e| LedgerError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        Ok(())
    }
}

fn read_rows(path: &Path) -> Result<Vec<LedgerRow>, LedgerError> {
    let csv_error = |source| LedgerError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?;
    if !headers.iter().eq(LEDGER_COLUMNS.iter().copied()) {
        return Err(LedgerError::SchemaMismatch {
            path: path.to_path_buf(),
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<LedgerRow>, _>>()
        .map_err(csv_error)
}
