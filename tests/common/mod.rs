#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sales_tracker::browser::{DriverError, ElementRef, Locator, PageDriver, SessionFactory};
use sales_tracker::models::observation::Observation;
use sales_tracker::scrapers::product_page::selectors;

/// WebDriver key code for Enter
pub const ENTER_KEY: char = '\u{E007}';

/// How a simulated product page behaves
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub title: String,
    pub rating_text: String,
    pub seller: Option<String>,
    pub cookie_banner: bool,
    pub price_text: String,
    /// `None` means the availability message never renders
    pub availability_text: Option<String>,
    /// Lookups of the add-to-cart button that come back empty first
    pub add_to_cart_hidden_polls: usize,
    pub add_to_cart_never: bool,
    /// Clicks on "Go to Cart" that do nothing before one opens the cart
    pub ignored_cart_clicks: usize,
    pub lose_session_on_add_to_cart: bool,
}

impl FakeProduct {
    pub fn in_stock(units: i64) -> Self {
        Self {
            title: "Green Tea Fat Burner 60 Capsules".to_string(),
            rating_text: "4.2 318".to_string(),
            seller: Some("Nutri Direct".to_string()),
            cookie_banner: true,
            price_text: "R 249".to_string(),
            availability_text: Some(format!("You asked for 9999, {} are available", units)),
            add_to_cart_hidden_polls: 0,
            add_to_cart_never: false,
            ignored_cart_clicks: 0,
            lose_session_on_add_to_cart: false,
        }
    }
}

/// Search front page and the result pages "Load More" reveals one by one
#[derive(Debug, Clone)]
pub struct FakeSearch {
    pub site_url: String,
    pub has_search_box: bool,
    /// Product link hrefs per result page
    pub pages: Vec<Vec<String>>,
}

impl FakeSearch {
    pub fn new(site_url: &str, pages: &[&[&str]]) -> Self {
        Self {
            site_url: site_url.to_string(),
            has_search_box: true,
            pages: pages
                .iter()
                .map(|page| page.iter().map(|href| href.to_string()).collect())
                .collect(),
        }
    }
}

/// Everything the fake browser saw, shared across sessions
#[derive(Debug, Default)]
pub struct BrowserLog {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub visited: Vec<String>,
    pub clicks: Vec<&'static str>,
    pub script_clicks: usize,
    pub selected: Vec<String>,
    pub typed: Vec<String>,
    pub removed_from_cart: usize,
    pub load_more_clicks: usize,
}

#[derive(Clone, Default)]
pub struct FakeShop {
    products: Arc<Mutex<HashMap<String, FakeProduct>>>,
    search: Arc<Mutex<Option<FakeSearch>>>,
    pub log: Arc<Mutex<BrowserLog>>,
}

impl FakeShop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(self, url: &str, product: FakeProduct) -> Self {
        self.set_product(url, product);
        self
    }

    pub fn with_search(self, search: FakeSearch) -> Self {
        *self.search.lock().unwrap() = Some(search);
        self
    }

    pub fn set_product(&self, url: &str, product: FakeProduct) {
        self.products
            .lock()
            .unwrap()
            .insert(url.to_string(), product);
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, BrowserLog> {
        self.log.lock().unwrap()
    }
}

#[async_trait]
impl SessionFactory for FakeShop {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        self.log().sessions_opened += 1;
        Ok(Box::new(FakeSession {
            shop: self.clone(),
            page: None,
            add_to_cart_polls: 0,
            cart_clicks: 0,
            in_cart: false,
            cart_open: false,
            updated: false,
            on_front_page: false,
            results_shown: None,
            cookie_dismissed: false,
        }))
    }
}

struct FakeSession {
    shop: FakeShop,
    page: Option<FakeProduct>,
    add_to_cart_polls: usize,
    cart_clicks: usize,
    in_cart: bool,
    cart_open: bool,
    updated: bool,
    on_front_page: bool,
    /// Index of the last result page revealed, once a search is submitted
    results_shown: Option<usize>,
    cookie_dismissed: bool,
}

impl FakeSession {
    fn element(locator: &Locator) -> ElementRef {
        ElementRef(locator.value().to_string())
    }

    fn is(element: &ElementRef, locator: Locator) -> bool {
        element.0 == locator.value()
    }

    fn search(&self) -> Option<FakeSearch> {
        self.shop.search.lock().unwrap().clone()
    }

    fn present_on_search(&self, locator: &Locator) -> bool {
        let Some(search) = self.search() else {
            return false;
        };
        match *locator {
            l if l == selectors::SEARCH_BOX => self.on_front_page && search.has_search_box,
            l if l == selectors::COOKIE_BANNER => !self.cookie_dismissed,
            l if l == selectors::LOAD_MORE => self
                .results_shown
                .is_some_and(|shown| shown + 1 < search.pages.len()),
            _ => false,
        }
    }

    fn present(&mut self, locator: &Locator) -> Result<bool, DriverError> {
        let Some(page) = self.page.clone() else {
            return Ok((self.on_front_page || self.results_shown.is_some())
                && self.present_on_search(locator));
        };

        let found = match *locator {
            l if l == selectors::TITLE || l == selectors::RATING_AND_REVIEWS => true,
            l if l == selectors::SELLER => page.seller.is_some(),
            l if l == selectors::COOKIE_BANNER => page.cookie_banner,
            l if l == selectors::PROMO_MODAL_CLOSE => false,
            l if l == selectors::ADD_TO_CART => {
                self.add_to_cart_polls += 1;
                !page.add_to_cart_never && self.add_to_cart_polls > page.add_to_cart_hidden_polls
            }
            l if l == selectors::GO_TO_CART => self.in_cart,
            l if l == selectors::CART_PRICE
                || l == selectors::QUANTITY
                || l == selectors::UPDATE_QUANTITY
                || l == selectors::REMOVE_ITEM =>
            {
                self.cart_open && self.in_cart
            }
            l if l == selectors::AVAILABILITY => {
                self.updated && self.in_cart && page.availability_text.is_some()
            }
            _ => false,
        };
        Ok(found)
    }

    fn record_click(&self, element: &ElementRef) {
        let name = [
            ("cookie", selectors::COOKIE_BANNER),
            ("add_to_cart", selectors::ADD_TO_CART),
            ("go_to_cart", selectors::GO_TO_CART),
            ("update", selectors::UPDATE_QUANTITY),
            ("remove", selectors::REMOVE_ITEM),
            ("load_more", selectors::LOAD_MORE),
        ]
        .into_iter()
        .find(|(_, l)| Self::is(element, *l))
        .map(|(n, _)| n)
        .unwrap_or("other");
        self.shop.log().clicks.push(name);
    }

    fn press_go_to_cart(&mut self) {
        self.cart_clicks += 1;
        let ignored = self.page.as_ref().map_or(0, |p| p.ignored_cart_clicks);
        if self.cart_clicks > ignored {
            self.cart_open = true;
        }
    }
}

#[async_trait]
impl PageDriver for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.shop.log().visited.push(url.to_string());
        self.page = self.shop.products.lock().unwrap().get(url).cloned();
        self.on_front_page = self.search().is_some_and(|s| s.site_url == url);
        self.results_shown = None;
        Ok(())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError> {
        Ok(self.present(locator)?.then(|| Self::element(locator)))
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        Ok(self.find(locator).await?.into_iter().collect())
    }

    async fn text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| DriverError::UnexpectedResponse("no page".to_string()))?;

        let text = if Self::is(element, selectors::TITLE) {
            page.title
        } else if Self::is(element, selectors::RATING_AND_REVIEWS) {
            page.rating_text
        } else if Self::is(element, selectors::SELLER) {
            page.seller.unwrap_or_default()
        } else if Self::is(element, selectors::CART_PRICE) {
            page.price_text
        } else if Self::is(element, selectors::AVAILABILITY) {
            page.availability_text.unwrap_or_default()
        } else {
            String::new()
        };
        Ok(text)
    }

    async fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.record_click(element);

        if self.page.is_none() {
            if Self::is(element, selectors::COOKIE_BANNER) {
                self.cookie_dismissed = true;
            } else if Self::is(element, selectors::LOAD_MORE) {
                self.results_shown = self.results_shown.map(|shown| shown + 1);
                self.shop.log().load_more_clicks += 1;
            }
            return Ok(());
        }

        if Self::is(element, selectors::ADD_TO_CART) {
            if self.page.as_ref().is_some_and(|p| p.lose_session_on_add_to_cart) {
                return Err(DriverError::SessionLost("chrome not reachable".to_string()));
            }
            self.in_cart = true;
        } else if Self::is(element, selectors::GO_TO_CART) {
            self.press_go_to_cart();
        } else if Self::is(element, selectors::UPDATE_QUANTITY) {
            self.updated = true;
        } else if Self::is(element, selectors::REMOVE_ITEM) {
            self.in_cart = false;
            self.shop.log().removed_from_cart += 1;
        }
        Ok(())
    }

    async fn script_click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.shop.log().script_clicks += 1;
        if Self::is(element, selectors::GO_TO_CART) {
            self.press_go_to_cart();
        }
        Ok(())
    }

    async fn set_text(&mut self, element: &ElementRef, value: &str) -> Result<(), DriverError> {
        self.shop.log().typed.push(value.to_string());
        if Self::is(element, selectors::SEARCH_BOX) && value.ends_with(ENTER_KEY) {
            self.on_front_page = false;
            self.results_shown = Some(0);
        }
        Ok(())
    }

    async fn select_option(
        &mut self,
        _element: &ElementRef,
        label: &str,
    ) -> Result<(), DriverError> {
        self.shop.log().selected.push(label.to_string());
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, DriverError> {
        let (Some(search), Some(shown)) = (self.search(), self.results_shown) else {
            return Ok(String::new());
        };
        let anchors: String = search
            .pages
            .iter()
            .take(shown + 1)
            .flatten()
            .map(|href| format!(r#"<a class="product-anchor" href="{}">item</a>"#, href))
            .collect();
        Ok(format!("<html><body><div>{}</div></body></html>", anchors))
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        self.shop.log().sessions_closed += 1;
        Ok(())
    }
}

pub fn at(hours_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(hours_ago)
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

pub fn observation(url: &str, name: &str, timestamp: DateTime<Utc>, available_units: i64) -> Observation {
    Observation {
        timestamp,
        url: url.to_string(),
        name: name.to_string(),
        review_count: 40,
        avg_rating: 4.4,
        seller: "Nutri Direct".to_string(),
        price: dec!(199),
        available_units,
    }
}
