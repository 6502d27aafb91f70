use std::time::Duration;

use thiserror::Error;

use crate::wizard::WizardStep;

/// Errors that can occur while driving the booking widget.
#[derive(Debug, Error)]
pub enum BookingError {
    /// No element matched the selector.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// An element never became visible within its timeout.
    #[error("timed out after {timeout:?} waiting for element {selector:?}")]
    Timeout { selector: String, timeout: Duration },

    /// A wizard step aborted the flow. Calendar and time-slot retries are
    /// handled inside their own bounded loops and never surface here.
    #[error("booking step '{step}' failed: {source}")]
    StepFailed {
        step: WizardStep,
        #[source]
        source: Box<BookingError>,
    },

    /// The caller-supplied date cannot be driven (e.g. month out of 1-12).
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// The caller-supplied time string has no parsable leading hour.
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// A selector string could not be parsed.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Failed to reach the DevTools endpoint or page target.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    Cdp { code: i64, message: String },

    /// Serialization or unexpected message format on the CDP channel.
    #[error("CDP protocol error: {0}")]
    Protocol(String),

    /// In-page JavaScript threw while searching or interacting.
    #[error("JavaScript exception: {0}")]
    JsException(String),
}

impl BookingError {
    /// Wrap an error with the wizard step it aborted.
    pub(crate) fn in_step(self, step: WizardStep) -> Self {
        BookingError::StepFailed {
            step,
            source: Box::new(self),
        }
    }
}
