//! Date-strip navigation.
//!
//! The widget's calendar is a paginated strip with no "jump to date"
//! affordance; the only way forward is its "next" control. Navigation is
//! therefore a bounded linear search: probe for the target label, page
//! forward, re-probe. Retry exhaustion is an outcome, not an error, so
//! the caller decides whether to continue.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::driver::{probe, PageDriver, DEFAULT_WAIT_TIMEOUT};
use crate::errors::BookingError;
use crate::selector::Selector;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// CSS class of the date strip's forward-navigation control.
const NEXT_BUTTON: &str = ".DateStrip_navButton__Zoc7Z.undefined";
/// CSS class of an individual day cell.
const DAY_CELL: &str = ".DateStrip_dayCtDate__u1AKh";

/// Bounded-retry parameters for one search phase, independent of any UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub settle_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(
        max_attempts: u32,
        per_attempt_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            per_attempt_timeout,
            settle_delay,
        }
    }

    /// Month/year phase: up to two years of paging.
    pub const MONTH_SEARCH: RetryPolicy =
        RetryPolicy::new(24, Duration::from_secs(1), Duration::from_millis(500));

    /// Day phase: up to two weeks of paging past the located month.
    pub const DAY_SEARCH: RetryPolicy =
        RetryPolicy::new(14, Duration::from_secs(1), Duration::from_millis(500));
}

/// Result of one bounded search phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found,
    Exhausted { attempts: u32 },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found)
    }
}

/// Outcome of a full date navigation: both phases report independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNavigation {
    pub month: SearchOutcome,
    pub day: SearchOutcome,
}

/// Drives the paginated date strip to a target day.
pub struct CalendarNavigator {
    driver: Arc<dyn PageDriver>,
    month_policy: RetryPolicy,
    day_policy: RetryPolicy,
}

impl CalendarNavigator {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self::with_policies(driver, RetryPolicy::MONTH_SEARCH, RetryPolicy::DAY_SEARCH)
    }

    pub fn with_policies(
        driver: Arc<dyn PageDriver>,
        month_policy: RetryPolicy,
        day_policy: RetryPolicy,
    ) -> Self {
        Self {
            driver,
            month_policy,
            day_policy,
        }
    }

    /// Bring the strip to the target month and select the target day.
    ///
    /// The month phase positions the page; the day phase assumes it did.
    /// Either phase may exhaust its attempt budget, which leaves the strip
    /// wherever the last attempt put it and is reported in the returned
    /// [`DateNavigation`] rather than raised.
    #[instrument(level = "debug", skip(self))]
    pub async fn navigate_to_date(
        &self,
        day: u32,
        month: u32,
        year: i32,
    ) -> Result<DateNavigation, BookingError> {
        let month_name = month
            .checked_sub(1)
            .and_then(|i| MONTH_NAMES.get(i as usize))
            .copied()
            .ok_or_else(|| BookingError::InvalidDate(format!("month {month} out of range 1-12")))?;

        info!(day, month = month_name, year, "navigating date strip");

        let month_outcome = self.seek_month(month_name, year).await?;
        if let SearchOutcome::Exhausted { attempts } = month_outcome {
            warn!(
                attempts,
                month = month_name,
                year,
                "month/year never became visible"
            );
        }

        let day_outcome = self.seek_day(day).await?;
        if let SearchOutcome::Exhausted { attempts } = day_outcome {
            warn!(attempts, day, "day cell never became visible");
        }

        Ok(DateNavigation {
            month: month_outcome,
            day: day_outcome,
        })
    }

    /// Page forward until the strip's header shows the target month.
    ///
    /// Near month boundaries the widget renders a two-month range header
    /// ("July / August 2025"), so a miss on the exact label falls back to
    /// a composite match on one label carrying both substrings.
    async fn seek_month(&self, month_name: &str, year: i32) -> Result<SearchOutcome, BookingError> {
        let exact = Selector::text(format!("{month_name} {year}"));
        let range = Selector::And(vec![
            Selector::text_contains(month_name),
            Selector::text_contains(year.to_string()),
        ]);

        for attempt in 1..=self.month_policy.max_attempts {
            if probe(&*self.driver, &exact, self.month_policy.per_attempt_timeout)
                .await?
                .is_some()
            {
                debug!(attempt, "found month/year header");
                return Ok(SearchOutcome::Found);
            }

            if probe(&*self.driver, &range, self.month_policy.per_attempt_timeout)
                .await?
                .is_some()
            {
                debug!(attempt, "found month/year in range header");
                return Ok(SearchOutcome::Found);
            }

            debug!(attempt, "target month not visible, paging forward");
            self.click_next().await?;
            self.driver.settle(self.month_policy.settle_delay).await;
        }

        Ok(SearchOutcome::Exhausted {
            attempts: self.month_policy.max_attempts,
        })
    }

    /// Page forward until a day cell with the target number is visible,
    /// then click the first match.
    async fn seek_day(&self, day: u32) -> Result<SearchOutcome, BookingError> {
        let cell = Selector::And(vec![
            Selector::css(DAY_CELL),
            Selector::text(day.to_string()),
        ]);

        for attempt in 1..=self.day_policy.max_attempts {
            match self
                .driver
                .find_elements(&cell, self.day_policy.per_attempt_timeout)
                .await
            {
                Ok(cells) => {
                    if let Some(first) = cells.first() {
                        debug!(attempt, day, "found day cell, selecting it");
                        self.driver.click(first, false).await?;
                        return Ok(SearchOutcome::Found);
                    }
                }
                Err(BookingError::ElementNotFound(_)) | Err(BookingError::Timeout { .. }) => {}
                Err(other) => return Err(other),
            }

            debug!(attempt, day, "day not visible, paging forward");
            self.click_next().await?;
            self.driver.settle(self.day_policy.settle_delay).await;
        }

        Ok(SearchOutcome::Exhausted {
            attempts: self.day_policy.max_attempts,
        })
    }

    /// The strip cannot be driven at all without its "next" control, so
    /// this failure propagates as a hard error.
    async fn click_next(&self) -> Result<(), BookingError> {
        let next = Selector::css(NEXT_BUTTON);
        let button = self.driver.find_element(&next, DEFAULT_WAIT_TIMEOUT).await?;
        self.driver.click(&button, false).await
    }
}
