use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::driver::{ElementHandle, PageDriver, DEFAULT_WAIT_TIMEOUT};
use crate::errors::BookingError;
use crate::selector::Selector;

/// A high-level API for finding and interacting with widget elements.
///
/// Pairs a [`Selector`] with a driver and a default timeout, so call
/// sites read as "wait for this, then click it".
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn PageDriver>,
    selector: Selector,
    timeout: Duration,
}

impl Locator {
    pub(crate) fn new(driver: Arc<dyn PageDriver>, selector: Selector) -> Self {
        Self {
            driver,
            selector,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Set a default timeout for waiting operations on this locator
    /// instance, used when no specific timeout is passed to a method.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for an element matching the locator to become visible, up to
    /// the specified timeout (or the locator's default).
    #[instrument(level = "debug", skip(self, timeout))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<ElementHandle, BookingError> {
        debug!(selector = %self.selector, "waiting for element");
        let effective_timeout = timeout.unwrap_or(self.timeout);

        self.driver
            .find_element(&self.selector, effective_timeout)
            .await
            .map_err(|e| {
                // The driver reports a plain not-found; surface it as the
                // timeout it is from the caller's point of view.
                if let BookingError::ElementNotFound(_) = e {
                    BookingError::Timeout {
                        selector: self.selector.to_string(),
                        timeout: effective_timeout,
                    }
                } else {
                    e
                }
            })
    }

    /// All visible elements matching this locator. `Ok` is non-empty.
    pub async fn all(&self, timeout: Option<Duration>) -> Result<Vec<ElementHandle>, BookingError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        self.driver
            .find_elements(&self.selector, effective_timeout)
            .await
    }

    /// First visible match.
    pub async fn first(&self, timeout: Option<Duration>) -> Result<ElementHandle, BookingError> {
        self.wait(timeout).await
    }

    /// Wait for the element and click it.
    pub async fn click(&self, timeout: Option<Duration>) -> Result<(), BookingError> {
        let element = self.wait(timeout).await?;
        self.driver.click(&element, false).await
    }

    /// Wait for the element and click it, skipping the visibility
    /// re-check.
    pub async fn force_click(&self, timeout: Option<Duration>) -> Result<(), BookingError> {
        let element = self.wait(timeout).await?;
        self.driver.click(&element, true).await
    }

    /// Wait for the element and replace its value.
    pub async fn fill(&self, text: &str, timeout: Option<Duration>) -> Result<(), BookingError> {
        let element = self.wait(timeout).await?;
        self.driver.fill(&element, text).await
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}
