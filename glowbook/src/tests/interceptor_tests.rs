//! Tests for passive startup-payload capture.

use std::sync::Arc;

use serde_json::json;

use super::{startup_payload, startup_url};
use crate::catalog::CatalogStore;
use crate::interceptor::ResponseInterceptor;

#[test]
fn unrelated_urls_are_ignored() {
    let catalog = Arc::new(CatalogStore::new());
    let interceptor = ResponseInterceptor::new(catalog.clone());

    interceptor.handle_response("https://booking.example.com/api/availability", &startup_payload());

    assert!(!catalog.is_captured());
}

#[test]
fn startup_response_populates_the_catalog() {
    let catalog = Arc::new(CatalogStore::new());
    let interceptor = ResponseInterceptor::new(catalog.clone());

    interceptor.handle_response(&startup_url(), &startup_payload());

    assert!(catalog.is_captured());
    assert_eq!(catalog.categories().len(), 2);
}

#[test]
fn malformed_body_keeps_previous_capture() {
    let catalog = Arc::new(CatalogStore::new());
    let interceptor = ResponseInterceptor::new(catalog.clone());

    interceptor.handle_response(&startup_url(), &startup_payload());
    interceptor.handle_response(&startup_url(), &json!("not a startup payload"));

    assert_eq!(catalog.categories().len(), 2);
}

#[test]
fn repeated_capture_is_last_writer_wins() {
    let catalog = Arc::new(CatalogStore::new());
    let interceptor = ResponseInterceptor::new(catalog.clone());

    interceptor.handle_response(&startup_url(), &startup_payload());
    interceptor.handle_response(
        &startup_url(),
        &json!({
            "servicesInfo": {
                "serviceCategories": [{ "id": 9, "name": "Spa Packages" }]
            }
        }),
    );

    let names: Vec<String> = catalog.categories().into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["Spa Packages"]);
}
