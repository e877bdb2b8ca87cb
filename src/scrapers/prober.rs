//! Stock prober
//!
//! Turns a product page's add-to-cart flow into an available-units reading:
//! add the item, open the cart, ask for far more units than can exist and read
//! back the figure the cart offers instead, then remove the item again.

use chrono::{SubsecRound, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::product_page::{
    parse_available_units, parse_price, parse_rating_and_reviews, selectors, MAX_QUANTITY_TIER,
    NO_SELLER, SENTINEL_QUANTITY,
};
use super::{ProbeConfig, ProbeError, ProbeStep};
use crate::browser::{DriverError, ElementRef, Locator, PageDriver, SessionFactory};
use crate::models::observation::Observation;

struct ProductDetails {
    name: String,
    avg_rating: f64,
    review_count: u32,
    seller: String,
}

pub struct StockProber {
    sessions: Arc<dyn SessionFactory>,
    config: ProbeConfig,
}

impl StockProber {
    pub fn new(sessions: Arc<dyn SessionFactory>, config: ProbeConfig) -> Self {
        Self { sessions, config }
    }

    /// Probe one product URL in a fresh browser session
    ///
    /// The session is torn down on every exit path. No partial observation is
    /// returned: any failure aborts the probe for this cycle.
    pub async fn probe(&self, url: &str) -> Result<Observation, ProbeError> {
        let mut session = self
            .sessions
            .open()
            .await
            .map_err(|e| ProbeError::from_driver(ProbeStep::OpenSession, e))?;

        let result = self.run_protocol(&mut *session, url).await;

        if let Err(e) = session.quit().await {
            warn!(url = %url, error = %e, "Failed to close browser session");
        }

        result
    }

    async fn run_protocol(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
    ) -> Result<Observation, ProbeError> {
        debug!(url = %url, "Navigating to product page");
        driver
            .navigate(url)
            .await
            .map_err(|e| ProbeError::from_driver(ProbeStep::Navigate, e))?;
        self.settle().await;

        let details = self.read_product_details(driver).await?;

        self.dismiss_overlays(driver).await;

        let add_to_cart = self
            .wait_for(driver, ProbeStep::AddToCart, &selectors::ADD_TO_CART)
            .await?;
        driver
            .click(&add_to_cart)
            .await
            .map_err(|e| ProbeError::from_driver(ProbeStep::AddToCart, e))?;
        self.settle().await;

        // The item is in the cart from here on; it is removed whatever the reading outcome.
        let reading = self.read_cart(driver).await;
        let released = self.remove_from_cart(driver).await;

        let (price, available_units) = match (reading, released) {
            (Ok(reading), Ok(())) => reading,
            (Ok(reading), Err(e)) => {
                warn!(url = %url, error = %e, "Reading kept but item was not removed from cart");
                reading
            }
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(cleanup)) => {
                debug!(url = %url, error = %cleanup, "Cart cleanup after failed reading also failed");
                return Err(e);
            }
        };

        info!(
            url = %url,
            name = %details.name,
            available_units = available_units,
            "Probe complete"
        );

        Ok(Observation {
            timestamp: Utc::now().trunc_subsecs(0),
            url: url.to_string(),
            name: details.name,
            review_count: details.review_count,
            avg_rating: details.avg_rating,
            seller: details.seller,
            price,
            available_units,
        })
    }

    async fn read_product_details(
        &self,
        driver: &mut dyn PageDriver,
    ) -> Result<ProductDetails, ProbeError> {
        let step = ProbeStep::ReadProductDetails;

        let name = self.read_text(driver, step, &selectors::TITLE).await?;

        let rating_text = self
            .read_text(driver, step, &selectors::RATING_AND_REVIEWS)
            .await?;
        let (avg_rating, review_count) =
            parse_rating_and_reviews(&rating_text).ok_or_else(|| ProbeError::Unparseable {
                step,
                text: rating_text.clone(),
            })?;

        let seller = match driver
            .find(&selectors::SELLER)
            .await
            .map_err(|e| ProbeError::from_driver(step, e))?
        {
            Some(element) => {
                let text = driver
                    .text(&element)
                    .await
                    .map_err(|e| ProbeError::from_driver(step, e))?;
                let text = text.trim();
                if text.is_empty() { NO_SELLER.to_string() } else { text.to_string() }
            }
            None => NO_SELLER.to_string(),
        };

        Ok(ProductDetails {
            name,
            avg_rating,
            review_count,
            seller,
        })
    }

    /// Close the cookie banner and promo modal when present; never fails
    async fn dismiss_overlays(&self, driver: &mut dyn PageDriver) {
        for locator in [selectors::COOKIE_BANNER, selectors::PROMO_MODAL_CLOSE] {
            match driver.find(&locator).await {
                Ok(Some(element)) => match driver.click(&element).await {
                    Ok(()) => self.settle().await,
                    Err(e) => debug!(locator = %locator, error = %e, "Overlay close failed"),
                },
                Ok(None) => {}
                Err(e) => debug!(locator = %locator, error = %e, "Overlay lookup failed"),
            }
        }
    }

    async fn read_cart(&self, driver: &mut dyn PageDriver) -> Result<(Decimal, i64), ProbeError> {
        self.open_cart(driver).await?;

        let price_text = self
            .read_text(driver, ProbeStep::ReadPrice, &selectors::CART_PRICE)
            .await?;
        let price = parse_price(&price_text).ok_or_else(|| ProbeError::Unparseable {
            step: ProbeStep::ReadPrice,
            text: price_text.clone(),
        })?;

        self.maximize_quantity(driver).await?;

        let message = self
            .read_text(driver, ProbeStep::ReadAvailability, &selectors::AVAILABILITY)
            .await?;
        let available_units =
            parse_available_units(&message).ok_or_else(|| ProbeError::Unparseable {
                step: ProbeStep::ReadAvailability,
                text: message.clone(),
            })?;

        Ok((price, available_units))
    }

    /// Open the cart view, retrying through a script-dispatched click
    ///
    /// The "Go to Cart" control intermittently swallows clicks, so the first
    /// attempt clicks natively and later ones dispatch the click from page
    /// script, until the cart line item shows up or the attempt cap is hit.
    async fn open_cart(&self, driver: &mut dyn PageDriver) -> Result<(), ProbeError> {
        let step = ProbeStep::OpenCart;
        let button = self.wait_for(driver, step, &selectors::GO_TO_CART).await?;
        let attempts = self.config.open_cart_attempts.max(1);

        for attempt in 1..=attempts {
            let clicked = if attempt == 1 {
                driver.click(&button).await
            } else {
                driver.script_click(&button).await
            };

            match clicked {
                Ok(()) => {}
                Err(DriverError::SessionLost(message)) => {
                    return Err(ProbeError::SessionLost { step, message });
                }
                Err(e) => warn!(attempt = attempt, error = %e, "Failed to click 'Go to Cart' button"),
            }

            self.settle().await;

            if self.is_present(driver, step, &selectors::CART_PRICE).await? {
                debug!(attempt = attempt, "Cart view open");
                return Ok(());
            }

            if attempt < attempts {
                sleep(self.config.open_cart_delay).await;
            }
        }

        Err(ProbeError::TransitionTimeout { step, attempts })
    }

    /// Pick the top quantity tier, type the sentinel quantity and submit
    async fn maximize_quantity(&self, driver: &mut dyn PageDriver) -> Result<(), ProbeError> {
        let step = ProbeStep::MaximizeQuantity;

        let select = self.find_required(driver, step, &selectors::QUANTITY).await?;
        driver
            .select_option(&select, MAX_QUANTITY_TIER)
            .await
            .map_err(|e| ProbeError::from_driver(step, e))?;
        self.settle().await;

        // Choosing the top tier swaps the dropdown for a free-text field under the same id
        let input = self.find_required(driver, step, &selectors::QUANTITY).await?;
        driver
            .set_text(&input, SENTINEL_QUANTITY)
            .await
            .map_err(|e| ProbeError::from_driver(step, e))?;
        self.settle().await;

        let update = self
            .find_required(driver, step, &selectors::UPDATE_QUANTITY)
            .await?;
        driver
            .click(&update)
            .await
            .map_err(|e| ProbeError::from_driver(step, e))?;
        self.settle().await;

        Ok(())
    }

    async fn remove_from_cart(&self, driver: &mut dyn PageDriver) -> Result<(), ProbeError> {
        let step = ProbeStep::RemoveFromCart;
        let remove = self
            .find_required(driver, step, &selectors::REMOVE_ITEM)
            .await?;
        driver
            .click(&remove)
            .await
            .map_err(|e| ProbeError::from_driver(step, e))?;
        self.settle().await;
        Ok(())
    }

    async fn read_text(
        &self,
        driver: &mut dyn PageDriver,
        step: ProbeStep,
        locator: &Locator,
    ) -> Result<String, ProbeError> {
        let element = self.find_required(driver, step, locator).await?;
        let text = driver
            .text(&element)
            .await
            .map_err(|e| ProbeError::from_driver(step, e))?;
        Ok(text.trim().to_string())
    }

    /// Look an element up, retrying a bounded number of times
    async fn find_required(
        &self,
        driver: &mut dyn PageDriver,
        step: ProbeStep,
        locator: &Locator,
    ) -> Result<ElementRef, ProbeError> {
        let attempts = self.config.element_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(element) = driver
                .find(locator)
                .await
                .map_err(|e| ProbeError::from_driver(step, e))?
            {
                return Ok(element);
            }

            if attempt < attempts {
                debug!(step = %step, locator = %locator, attempt = attempt, "Element not found, retrying");
                sleep(self.config.retry_delay).await;
            }
        }

        Err(ProbeError::ElementNotFound {
            step,
            locator: locator.to_string(),
        })
    }

    /// Poll for an element until it appears or `element_timeout` elapses
    async fn wait_for(
        &self,
        driver: &mut dyn PageDriver,
        step: ProbeStep,
        locator: &Locator,
    ) -> Result<ElementRef, ProbeError> {
        let started = Instant::now();
        let deadline = started + self.config.element_timeout;

        loop {
            if let Some(element) = driver
                .find(locator)
                .await
                .map_err(|e| ProbeError::from_driver(step, e))?
            {
                return Ok(element);
            }

            if Instant::now() >= deadline {
                return Err(ProbeError::WaitTimeout {
                    step,
                    locator: locator.to_string(),
                    waited: started.elapsed(),
                });
            }

            sleep(self.config.poll_interval).await;
        }
    }

    async fn is_present(
        &self,
        driver: &mut dyn PageDriver,
        step: ProbeStep,
        locator: &Locator,
    ) -> Result<bool, ProbeError> {
        driver
            .find(locator)
            .await
            .map(|found| found.is_some())
            .map_err(|e| ProbeError::from_driver(step, e))
    }

    async fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            sleep(self.config.settle_delay).await;
        }
    }
}
