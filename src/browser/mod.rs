//! Browser session abstraction
//!
//! The stock prober and URL discovery only talk to a page through
//! [`PageDriver`]. A [`SessionFactory`] hands out one fresh session per unit of
//! work; the caller owns it and must `quit()` it on every exit path.

pub mod webdriver;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// How to locate an element on the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
    Id(&'static str),
    Name(&'static str),
}

impl Locator {
    /// Raw selector text, without the strategy
    pub fn value(&self) -> &'static str {
        match self {
            Locator::Css(v) | Locator::XPath(v) | Locator::Id(v) | Locator::Name(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Name(v) => write!(f, "name={}", v),
        }
    }
}

/// Opaque handle to an element found in the current session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("webdriver error {status} ({error}): {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    #[error("webdriver transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected webdriver response: {0}")]
    UnexpectedResponse(String),
}

/// Selector-based page interaction primitives
#[async_trait]
pub trait PageDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// `Ok(None)` when nothing on the page matches
    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError>;

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError>;

    async fn text(&mut self, element: &ElementRef) -> Result<String, DriverError>;

    async fn click(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    /// Click dispatched from page script, for controls that ignore synthetic input
    async fn script_click(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    /// Clear the control, then type `value`
    async fn set_text(&mut self, element: &ElementRef, value: &str) -> Result<(), DriverError>;

    /// Pick the `<option>` of a `<select>` whose visible text equals `label`
    async fn select_option(&mut self, element: &ElementRef, label: &str)
    -> Result<(), DriverError>;

    async fn page_source(&mut self) -> Result<String, DriverError>;

    /// Tear the session down; the driver must not be used afterwards
    async fn quit(&mut self) -> Result<(), DriverError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::Css("a.b").to_string(), "css=a.b");
        assert_eq!(Locator::Id("cart").to_string(), "id=cart");
        assert_eq!(Locator::XPath("//div").value(), "//div");
    }
}
