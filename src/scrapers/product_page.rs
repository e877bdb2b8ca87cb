//! Product page and cart layout of the tracked storefront
//!
//! Locators and the text formats the prober reads off the page.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Recorded when a product page carries no seller block
pub const NO_SELLER: &str = "No seller information";

/// Highest tier of the cart quantity dropdown; choosing it unlocks free-text entry
pub const MAX_QUANTITY_TIER: &str = "10+";

/// Quantity requested to make the cart reveal how many units exist.
/// Readings are only exact while true stock stays below this.
pub const SENTINEL_QUANTITY: &str = "9999";

pub mod selectors {
    use crate::browser::Locator;

    pub const TITLE: Locator = Locator::Css(".product-title h1");
    pub const RATING_AND_REVIEWS: Locator = Locator::Css(".rating-and-reviews");
    pub const SELLER: Locator = Locator::Css(".seller-information span a");

    pub const COOKIE_BANNER: Locator = Locator::XPath(r#"//button[text()="Got it"]"#);
    pub const PROMO_MODAL_CLOSE: Locator = Locator::Css("button.modal-module_close-button_asjao");

    pub const ADD_TO_CART: Locator = Locator::Css(r#"a[data-ref="add-to-cart-button"]"#);
    pub const GO_TO_CART: Locator = Locator::XPath(r#"//button[contains(text(), "Go to Cart")]"#);

    pub const CART_PRICE: Locator =
        Locator::Css(".cart-item-module_price-container_1IAjB .currency.plus");
    pub const QUANTITY: Locator = Locator::Id("cart-item_undefined");
    pub const UPDATE_QUANTITY: Locator =
        Locator::XPath(r#"//button[@data-ref="quantity-update-button"]"#);
    pub const AVAILABILITY: Locator = Locator::XPath(r#"//div[contains(text(), "You asked for")]"#);
    pub const REMOVE_ITEM: Locator = Locator::XPath(r#"//button[@data-ref="remove-item-button"]"#);

    pub const SEARCH_BOX: Locator = Locator::Name("search");
    pub const LOAD_MORE: Locator = Locator::XPath(r#"//button[text()="Load More"]"#);
    /// CSS form of the search-result product links, also used on raw page source
    pub const PRODUCT_ANCHOR: &str = "a.product-anchor";
}

lazy_static! {
    static ref INTEGER_REGEX: Regex = Regex::new(r"\d+").unwrap();
}

/// Split the "rating reviews" block into `(avg_rating, review_count)`
///
/// The first whitespace token is the average rating, the second the review
/// count; decoration such as parentheses or thousands separators is ignored.
pub fn parse_rating_and_reviews(text: &str) -> Option<(f64, u32)> {
    let mut tokens = text.split_whitespace();
    let rating_token = tokens.next()?;
    let reviews_token = tokens.next()?;

    let rating: String = rating_token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let reviews: String = reviews_token.chars().filter(char::is_ascii_digit).collect();

    Some((rating.parse().ok()?, reviews.parse().ok()?))
}

/// Parse a displayed price ("R 1,299", "1299.00") into a decimal amount
pub fn parse_price(text: &str) -> Option<Decimal> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(&digits).ok()
}

/// Extract available units from "You asked for X, Y are available"
///
/// The second integer in the message is the availability figure.
pub fn parse_available_units(text: &str) -> Option<i64> {
    INTEGER_REGEX
        .find_iter(text)
        .nth(1)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_available_units() {
        assert_eq!(
            parse_available_units("You asked for 9999, 137 are available"),
            Some(137)
        );
        assert_eq!(
            parse_available_units("You asked for 9999 but only 3 are available."),
            Some(3)
        );
        assert_eq!(parse_available_units("You asked for 9999"), None);
        assert_eq!(parse_available_units("Out of stock"), None);
    }

    #[test]
    fn test_parse_rating_and_reviews() {
        assert_eq!(parse_rating_and_reviews("4.5 120"), Some((4.5, 120)));
        assert_eq!(parse_rating_and_reviews("  4.1   (1,234) "), Some((4.1, 1234)));
        assert_eq!(parse_rating_and_reviews("4.5"), None);
        assert_eq!(parse_rating_and_reviews("No reviews"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("R 1,299"), Some(dec!(1299)));
        assert_eq!(parse_price("R 89.90"), Some(dec!(89.90)));
        assert_eq!(parse_price("Free"), None);
    }
}
