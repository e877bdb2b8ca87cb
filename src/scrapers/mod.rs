pub mod discovery;
pub mod product_page;
pub mod prober;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::browser::DriverError;

/// Stages of a single stock probe, in protocol order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    OpenSession,
    Navigate,
    ReadProductDetails,
    DismissOverlays,
    AddToCart,
    OpenCart,
    ReadPrice,
    MaximizeQuantity,
    ReadAvailability,
    RemoveFromCart,
}

impl ProbeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStep::OpenSession => "open_session",
            ProbeStep::Navigate => "navigate",
            ProbeStep::ReadProductDetails => "read_product_details",
            ProbeStep::DismissOverlays => "dismiss_overlays",
            ProbeStep::AddToCart => "add_to_cart",
            ProbeStep::OpenCart => "open_cart",
            ProbeStep::ReadPrice => "read_price",
            ProbeStep::MaximizeQuantity => "maximize_quantity",
            ProbeStep::ReadAvailability => "read_availability",
            ProbeStep::RemoveFromCart => "remove_from_cart",
        }
    }
}

impl fmt::Display for ProbeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe produced no observation this cycle
///
/// Every variant is recoverable at the run level: the product is skipped and
/// picked up again by the next scheduled cycle.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{step}: element {locator} not found")]
    ElementNotFound { step: ProbeStep, locator: String },

    #[error("{step}: element {locator} did not appear within {waited:?}")]
    WaitTimeout {
        step: ProbeStep,
        locator: String,
        waited: Duration,
    },

    #[error("{step}: page did not change after {attempts} attempts")]
    TransitionTimeout { step: ProbeStep, attempts: u32 },

    #[error("{step}: unexpected text {text:?}")]
    Unparseable { step: ProbeStep, text: String },

    #[error("{step}: browser session lost: {message}")]
    SessionLost { step: ProbeStep, message: String },

    #[error("{step}: {source}")]
    Driver {
        step: ProbeStep,
        #[source]
        source: DriverError,
    },
}

impl ProbeError {
    pub fn from_driver(step: ProbeStep, err: DriverError) -> Self {
        match err {
            DriverError::SessionLost(message) => ProbeError::SessionLost { step, message },
            source => ProbeError::Driver { step, source },
        }
    }

    /// Short failure label for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::ElementNotFound { .. } => "ElementNotFound",
            ProbeError::WaitTimeout { .. } => "WaitTimeout",
            ProbeError::TransitionTimeout { .. } => "TransitionTimeout",
            ProbeError::Unparseable { .. } => "Unparseable",
            ProbeError::SessionLost { .. } => "SessionLost",
            ProbeError::Driver { .. } => "DriverError",
        }
    }

    pub fn step(&self) -> ProbeStep {
        match self {
            ProbeError::ElementNotFound { step, .. }
            | ProbeError::WaitTimeout { step, .. }
            | ProbeError::TransitionTimeout { step, .. }
            | ProbeError::Unparseable { step, .. }
            | ProbeError::SessionLost { step, .. }
            | ProbeError::Driver { step, .. } => *step,
        }
    }
}

/// Timing and retry bounds for page interaction
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Bounded wait for controls that appear asynchronously (add to cart, go to cart)
    pub element_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause after each state-changing interaction
    pub settle_delay: Duration,
    /// Lookups per required element before the probe is abandoned
    pub element_attempts: u32,
    pub retry_delay: Duration,
    /// Cap on open-cart attempts
    pub open_cart_attempts: u32,
    pub open_cart_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            element_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_secs(5),
            element_attempts: 3,
            retry_delay: Duration::from_secs(1),
            open_cart_attempts: 10,
            open_cart_delay: Duration::from_secs(1),
        }
    }
}

impl ProbeConfig {
    /// No waiting anywhere; lookups are tried once per attempt
    pub fn immediate() -> Self {
        Self {
            element_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            settle_delay: Duration::ZERO,
            element_attempts: 1,
            retry_delay: Duration::ZERO,
            open_cart_attempts: 3,
            open_cart_delay: Duration::ZERO,
        }
    }
}
