use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogStore, StartupData};

/// Substring identifying the widget's startup payload endpoint.
pub const STARTUP_URL_MARKER: &str = "booking/app/startup";

/// Observes completed network responses and captures the startup payload
/// into the session's [`CatalogStore`].
///
/// Side effect only: nothing is returned to the response source and the
/// callback never blocks the session's event handling. The payload is
/// expected to be static per session, so a repeated hit simply replaces
/// the previous capture.
#[derive(Clone)]
pub struct ResponseInterceptor {
    catalog: Arc<CatalogStore>,
}

impl ResponseInterceptor {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Invoked once per completed response with its URL and JSON body.
    pub fn handle_response(&self, url: &str, body: &Value) {
        if !url.contains(STARTUP_URL_MARKER) {
            return;
        }

        match serde_json::from_value::<StartupData>(body.clone()) {
            Ok(data) => {
                info!(url, "captured startup catalog payload");
                self.catalog.capture(data);
            }
            Err(err) => {
                // Keep whatever was captured before; the payload shape is
                // externally owned.
                warn!(url, error = %err, "startup payload did not deserialize");
            }
        }

        debug!(captured = self.catalog.is_captured(), "catalog state");
    }
}
