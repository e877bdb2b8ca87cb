//! Product URL discovery
//!
//! Searches the storefront for the tracked keyword and pages through results
//! with "Load More" until enough product links are collected.

use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::product_page::selectors;
use crate::browser::{DriverError, PageDriver, SessionFactory};

/// Upper bound on "Load More" clicks per discovery run
const MAX_RESULT_PAGES: usize = 50;

/// Enter key in the WebDriver key table
const ENTER_KEY: char = '\u{E007}';

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid site url {0}")]
    InvalidSiteUrl(String),

    #[error("search box not found on {0}")]
    SearchBoxMissing(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

pub struct UrlDiscovery {
    sessions: Arc<dyn SessionFactory>,
    site_url: Url,
    page_delay: Duration,
}

impl UrlDiscovery {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        site_url: &str,
        page_delay: Duration,
    ) -> Result<Self, DiscoveryError> {
        let site_url =
            Url::parse(site_url).map_err(|_| DiscoveryError::InvalidSiteUrl(site_url.to_string()))?;
        Ok(Self {
            sessions,
            site_url,
            page_delay,
        })
    }

    /// Collect at least `min_count` distinct product URLs, if the results allow
    ///
    /// URLs are returned in the order first seen.
    pub async fn discover(
        &self,
        seed_query: &str,
        min_count: usize,
    ) -> Result<Vec<String>, DiscoveryError> {
        let mut session = self.sessions.open().await?;
        let result = self.collect(&mut *session, seed_query, min_count).await;
        if let Err(e) = session.quit().await {
            warn!(error = %e, "Failed to close discovery session");
        }
        result
    }

    async fn collect(
        &self,
        driver: &mut dyn PageDriver,
        seed_query: &str,
        min_count: usize,
    ) -> Result<Vec<String>, DiscoveryError> {
        driver.navigate(self.site_url.as_str()).await?;

        let search_box = driver
            .find(&selectors::SEARCH_BOX)
            .await?
            .ok_or_else(|| DiscoveryError::SearchBoxMissing(self.site_url.to_string()))?;
        driver
            .set_text(&search_box, &format!("{}{}", seed_query, ENTER_KEY))
            .await?;
        sleep(self.page_delay).await;

        if let Some(accept) = driver.find(&selectors::COOKIE_BANNER).await? {
            if let Err(e) = driver.click(&accept).await {
                debug!(error = %e, "Cookie banner close failed");
            }
            sleep(self.page_delay).await;
        }

        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for page in 1..=MAX_RESULT_PAGES {
            let html = driver.page_source().await?;
            let before = urls.len();
            for url in extract_product_links(&html, &self.site_url) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            info!(
                page = page,
                new_urls = urls.len() - before,
                total = urls.len(),
                "Scanned search results page"
            );

            if urls.len() >= min_count {
                break;
            }
            if page == MAX_RESULT_PAGES {
                warn!(pages = page, total = urls.len(), "Result page cap reached");
                break;
            }

            let Some(load_more) = driver.find(&selectors::LOAD_MORE).await? else {
                debug!("No more result pages");
                break;
            };
            driver.click(&load_more).await?;
            sleep(self.page_delay).await;
        }

        Ok(urls)
    }
}

/// Absolute URLs of the product links in a search results page
pub fn extract_product_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse(selectors::PRODUCT_ANCHOR) {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                match base.join(href) {
                    Ok(url) => links.push(url.to_string()),
                    Err(e) => debug!(href = %href, error = %e, "Skipping unparseable product link"),
                }
            }
        }
    }

    links
}

/// Union of `existing` and `discovered`, deduplicated, first-seen order
pub fn merge_urls(existing: &[String], discovered: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    existing
        .iter()
        .chain(discovered)
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_product_links_resolves_relative() {
        let html = r#"
            <div>
                <a class="product-anchor" href="/slim-tea/PLID1">Slim Tea</a>
                <a class="other" href="/not-a-product">x</a>
                <a class="product-anchor" href="https://www.takealot.com/shake/PLID2">Shake</a>
                <a class="product-anchor">no href</a>
            </div>"#;
        let base = Url::parse("https://www.takealot.com").unwrap();

        assert_eq!(
            extract_product_links(html, &base),
            vec![
                "https://www.takealot.com/slim-tea/PLID1",
                "https://www.takealot.com/shake/PLID2",
            ]
        );
    }

    #[test]
    fn test_merge_urls_dedupes_in_order() {
        let existing = vec!["a".to_string(), "b".to_string()];
        let discovered = vec!["c".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(merge_urls(&existing, &discovered), vec!["a", "b", "c"]);
    }
}
