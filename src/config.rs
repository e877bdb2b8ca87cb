//! Runtime configuration from the environment (and `.env`)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::scrapers::ProbeConfig;

const DEFAULT_KEYWORD: &str = "weight loss";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SEED_FILENAME: &str = "product_urls.csv";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_SITE_URL: &str = "https://www.takealot.com";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DISCOVERY_MIN_URLS: usize = 20;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Tracked keyword/category label: dashboard title and discovery query
    pub keyword: String,
    pub data_dir: PathBuf,
    pub seed_file: PathBuf,
    pub webdriver_url: String,
    pub headless: bool,
    pub site_url: String,
    pub discovery_min_urls: usize,
    pub probe_interval: Duration,
    pub bind_addr: String,
    pub probe: ProbeConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset names fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(
            lookup("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );
        let seed_file = lookup("SEED_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DEFAULT_SEED_FILENAME));

        let defaults = ProbeConfig::default();
        let probe = ProbeConfig {
            element_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROBE_ELEMENT_TIMEOUT_SECS",
                defaults.element_timeout.as_secs(),
            )?),
            settle_delay: Duration::from_millis(parse_or(
                &lookup,
                "PROBE_SETTLE_DELAY_MS",
                defaults.settle_delay.as_millis() as u64,
            )?),
            open_cart_attempts: positive_or(
                &lookup,
                "PROBE_OPEN_CART_ATTEMPTS",
                defaults.open_cart_attempts,
            )?,
            ..defaults
        };

        Ok(Self {
            keyword: lookup("TRACKED_KEYWORD").unwrap_or_else(|| DEFAULT_KEYWORD.to_string()),
            data_dir,
            seed_file,
            webdriver_url: lookup("WEBDRIVER_URL")
                .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            headless: parse_or(&lookup, "WEBDRIVER_HEADLESS", false)?,
            site_url: lookup("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            discovery_min_urls: parse_or(&lookup, "DISCOVERY_MIN_URLS", DEFAULT_DISCOVERY_MIN_URLS)?,
            probe_interval: Duration::from_secs(positive_or(
                &lookup,
                "PROBE_INTERVAL_SECS",
                DEFAULT_PROBE_INTERVAL_SECS,
            )?),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            probe,
        })
    }

    /// Title shown above the dashboard
    pub fn dashboard_title(&self) -> String {
        format!("Sales Analysis. {}.", self.keyword)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .to_lowercase()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Like `parse_or`, but zero is rejected
fn positive_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let value = parse_or(lookup, name, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: lookup(name).unwrap_or_default(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.keyword, "weight loss");
        assert_eq!(config.seed_file, PathBuf::from("data").join("product_urls.csv"));
        assert_eq!(config.probe_interval, Duration::from_secs(3600));
        assert_eq!(config.probe.element_timeout, Duration::from_secs(10));
        assert_eq!(config.discovery_min_urls, 20);
        assert!(!config.headless);
        assert_eq!(config.dashboard_title(), "Sales Analysis. weight loss.");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TRACKED_KEYWORD", "protein"),
            ("DATA_DIR", "/var/lib/tracker"),
            ("WEBDRIVER_HEADLESS", "TRUE"),
            ("PROBE_SETTLE_DELAY_MS", "250"),
            ("PROBE_OPEN_CART_ATTEMPTS", "4"),
        ])
        .unwrap();
        assert_eq!(config.keyword, "protein");
        assert_eq!(config.seed_file, PathBuf::from("/var/lib/tracker/product_urls.csv"));
        assert!(config.headless);
        assert_eq!(config.probe.settle_delay, Duration::from_millis(250));
        assert_eq!(config.probe.open_cart_attempts, 4);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[("PROBE_INTERVAL_SECS", "hourly")]).unwrap_err();
        assert!(err.to_string().contains("PROBE_INTERVAL_SECS"));
    }

    #[test]
    fn test_zero_interval_and_attempts_are_rejected() {
        let err = config_from(&[("PROBE_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "PROBE_INTERVAL_SECS",
                ..
            }
        ));

        let err = config_from(&[("PROBE_OPEN_CART_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "PROBE_OPEN_CART_ATTEMPTS",
                ..
            }
        ));

        assert!(config_from(&[("PROBE_INTERVAL_SECS", "1")]).is_ok());
    }
}
