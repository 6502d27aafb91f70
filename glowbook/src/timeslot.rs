//! Period-bucketed time-slot selection.
//!
//! The widget groups a day's slots under three collapsible headers
//! (Morning / Afternoon / Evening). Selecting a time means classifying
//! the requested time into its bucket, opening that bucket, and clicking
//! the exact slot label inside it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::driver::{probe, PageDriver, DEFAULT_WAIT_TIMEOUT};
use crate::errors::BookingError;
use crate::selector::Selector;

/// One of the widget's three slot buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    /// The bucket's header label prefix as rendered ("Afternoon: 4
    /// available").
    pub fn header(&self) -> &'static str {
        match self {
            Period::Morning => "Morning:",
            Period::Afternoon => "Afternoon:",
            Period::Evening => "Evening:",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Period::Morning => "Morning",
            Period::Afternoon => "Afternoon",
            Period::Evening => "Evening",
        })
    }
}

/// Classify a display-time string ("2:00 pm") into its period bucket.
///
/// The hour is the leading numeral before `:`; the am/pm suffix is
/// matched case-insensitively. Branch order is significant: the Evening
/// check runs before the Afternoon check, and the conditions are kept in
/// that shape.
pub fn classify_period(time: &str) -> Result<Period, BookingError> {
    let lower = time.to_lowercase();
    let hour: u32 = time
        .split(':')
        .next()
        .unwrap_or("")
        .trim()
        .parse()
        .map_err(|_| BookingError::InvalidTime(format!("no leading hour in {time:?}")))?;
    let is_pm = lower.contains("pm");

    if is_pm && hour >= 5 && hour < 12 {
        Ok(Period::Evening)
    } else if is_pm && (hour >= 12 || hour < 5) {
        Ok(Period::Afternoon)
    } else {
        Ok(Period::Morning)
    }
}

/// Result of a best-effort slot selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    Selected,
    /// The exact slot label never appeared inside the opened bucket.
    Unavailable,
}

/// Opens the right period bucket and selects the exact slot.
pub struct TimeSlotSelector {
    driver: Arc<dyn PageDriver>,
    /// How long the exact slot label gets to appear once the bucket is
    /// open.
    slot_timeout: Duration,
    /// Settle delay for the bucket's slots to render after opening.
    render_delay: Duration,
}

impl TimeSlotSelector {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            driver,
            slot_timeout: Duration::from_secs(5),
            render_delay: Duration::from_secs(1),
        }
    }

    /// Open the bucket for `time` and click the exact slot.
    ///
    /// A missing bucket header is a hard error (the day view is not
    /// showing at all); a missing slot inside an opened bucket is the
    /// deliberate best-effort outcome [`SlotOutcome::Unavailable`], and
    /// booking proceeds regardless.
    #[instrument(level = "debug", skip(self))]
    pub async fn select_time(&self, time: &str) -> Result<SlotOutcome, BookingError> {
        let period = classify_period(time)?;
        info!(%period, time, "opening period bucket");

        let header = Selector::text_contains(period.header());
        let bucket = self
            .driver
            .find_element(&header, DEFAULT_WAIT_TIMEOUT)
            .await?;
        self.driver.click(&bucket, false).await?;

        self.driver.settle(self.render_delay).await;

        let slot = Selector::text(time);
        match probe(&*self.driver, &slot, self.slot_timeout).await? {
            Some(element) => {
                self.driver.click(&element, false).await?;
                info!(time, "selected time slot");
                Ok(SlotOutcome::Selected)
            }
            None => {
                warn!(time, "time slot not available");
                Ok(SlotOutcome::Unavailable)
            }
        }
    }
}
