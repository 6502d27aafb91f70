//! Appointment-booking automation for the CityGlow online booking widget.
//!
//! The widget exposes no API: this crate books by observing rendered UI,
//! click-driving it, and re-observing, the way a person would. Two parts
//! carry the real machinery:
//!
//! - A [`CatalogStore`] reconstructing the widget's service/add-on/staff
//!   taxonomy from its startup payload, captured passively off the wire
//!   by a [`ResponseInterceptor`].
//! - The [`CalendarNavigator`] and [`TimeSlotSelector`], which drive the
//!   paginated date strip and period-bucketed slot list through bounded
//!   retries with no direct data access.
//!
//! A [`BookingWizard`] sequences the whole flow as an explicit state
//! machine. UI driving goes through the [`PageDriver`] trait; the
//! production backend is [`ChromePage`], which attaches to a running
//! Chrome over the DevTools protocol:
//!
//! ```sh
//! google-chrome --remote-debugging-port=9222
//! ```
//!
//! # Example (conceptual)
//!
//! ```ignore
//! use glowbook::{BookingSelection, BookingSession, ChromePage};
//!
//! let catalog = std::sync::Arc::new(glowbook::CatalogStore::new());
//! let interceptor = glowbook::ResponseInterceptor::new(catalog.clone());
//! let page = ChromePage::attach(9222, "cityglowflorida", Default::default(), interceptor).await?;
//! let session = BookingSession::with_catalog(std::sync::Arc::new(page), catalog);
//! session.make_appointment(&selection).await?;
//! ```

use std::sync::Arc;

use tracing::instrument;

pub mod calendar;
pub mod catalog;
pub mod cdp;
pub mod chrome;
pub mod driver;
pub mod errors;
pub mod interceptor;
pub mod locator;
pub mod selector;
#[cfg(test)]
mod tests;
pub mod timeslot;
pub mod wizard;

pub use calendar::{CalendarNavigator, DateNavigation, RetryPolicy, SearchOutcome};
pub use catalog::{CatalogStore, StartupData};
pub use chrome::ChromePage;
pub use driver::{ElementHandle, PageDriver};
pub use errors::BookingError;
pub use interceptor::ResponseInterceptor;
pub use locator::Locator;
pub use selector::Selector;
pub use timeslot::{classify_period, Period, SlotOutcome, TimeSlotSelector};
pub use wizard::{BookingSelection, BookingWizard, WizardState, WizardStep};

/// One attached booking session: a driven page plus the catalog captured
/// from its network traffic.
pub struct BookingSession {
    driver: Arc<dyn PageDriver>,
    catalog: Arc<CatalogStore>,
}

impl BookingSession {
    /// Session with a fresh, not-yet-captured catalog.
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self::with_catalog(driver, Arc::new(CatalogStore::new()))
    }

    /// Session over a catalog the caller already shares with a response
    /// observer.
    pub fn with_catalog(driver: Arc<dyn PageDriver>, catalog: Arc<CatalogStore>) -> Self {
        Self { driver, catalog }
    }

    pub fn catalog(&self) -> Arc<CatalogStore> {
        Arc::clone(&self.catalog)
    }

    /// An interceptor writing into this session's catalog; hand it to
    /// the network-observation side.
    pub fn interceptor(&self) -> ResponseInterceptor {
        ResponseInterceptor::new(self.catalog())
    }

    #[instrument(skip(self, selector))]
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.driver.clone(), selector.into())
    }

    /// Drive the full booking flow for one selection.
    #[instrument(skip(self, selection), fields(category = %selection.category, service = %selection.sub_service))]
    pub async fn make_appointment(
        &self,
        selection: &BookingSelection,
    ) -> Result<WizardState, BookingError> {
        let mut wizard = BookingWizard::new(self.driver.clone(), self.catalog());
        wizard.run(selection).await
    }
}
