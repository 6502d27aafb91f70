//! The UI-driving capability the booking flow depends on.
//!
//! Everything above this seam observes rendered UI, click-drives it, and
//! re-observes; it never touches widget internals. The production
//! implementation is [`crate::chrome::ChromePage`]; tests plug in a
//! scripted in-process double.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::BookingError;
use crate::selector::Selector;

/// Default timeout for waiting operations when none is specified.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque handle to an element in the driven page.
///
/// The handle is only valid for as long as the element stays attached;
/// the flow re-locates rather than caching handles across steps.
#[derive(Debug, Clone)]
pub struct ElementHandle {
    /// Backend-specific remote identifier.
    pub object_id: String,
    /// Rendered text observed when the element matched.
    pub text: Option<String>,
}

/// The common trait that page-driving backends must implement.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Wait for a visible element matching the selector, up to `timeout`.
    /// The backend owns the polling; callers never busy-wait themselves.
    async fn find_element(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BookingError>;

    /// Wait for at least one visible match and return all of them.
    /// An `Ok` result is guaranteed non-empty.
    async fn find_elements(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>, BookingError>;

    /// Click an element. A forced click skips the visibility re-check,
    /// which the widget's add-on toggles need (their hit target is
    /// overlaid by a styled label).
    async fn click(&self, element: &ElementHandle, force: bool) -> Result<(), BookingError>;

    /// Replace the value of a text input.
    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<(), BookingError>;

    /// Fixed-duration settle wait. Test doubles override this to keep the
    /// bounded navigation loops instant.
    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Probe for an element, mapping "not there in time" to `None` while
/// letting backend faults propagate.
pub(crate) async fn probe(
    driver: &dyn PageDriver,
    selector: &Selector,
    timeout: Duration,
) -> Result<Option<ElementHandle>, BookingError> {
    match driver.find_element(selector, timeout).await {
        Ok(element) => Ok(Some(element)),
        Err(BookingError::ElementNotFound(_)) | Err(BookingError::Timeout { .. }) => Ok(None),
        Err(other) => Err(other),
    }
}
