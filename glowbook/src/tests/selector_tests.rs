//! Tests for selector parsing.

use crate::selector::Selector;

#[test]
fn text_prefix_parses_to_exact_text() {
    assert_eq!(
        Selector::from("text:Facials"),
        Selector::Text("Facials".to_string())
    );
}

#[test]
fn text_star_prefix_parses_to_substring_match() {
    assert_eq!(
        Selector::from("text*:I agree to the cancellation"),
        Selector::TextContains("I agree to the cancellation".to_string())
    );
}

#[test]
fn pipe_format_parses_role_and_name() {
    assert_eq!(
        Selector::from("button|Continue"),
        Selector::Role {
            role: "button".to_string(),
            name: Some("Continue".to_string()),
        }
    );
    // Prefixed variants are accepted too.
    assert_eq!(
        Selector::from("role:textbox|name:First name"),
        Selector::Role {
            role: "textbox".to_string(),
            name: Some("First name".to_string()),
        }
    );
}

#[test]
fn role_prefix_and_bare_roles_parse_without_a_name() {
    assert_eq!(
        Selector::from("role:dialog"),
        Selector::Role {
            role: "dialog".to_string(),
            name: None,
        }
    );
    assert_eq!(
        Selector::from("button"),
        Selector::Role {
            role: "button".to_string(),
            name: None,
        }
    );
}

#[test]
fn css_forms_pass_through() {
    assert_eq!(
        Selector::from("css:.DateStrip_dayCtDate__u1AKh"),
        Selector::Css(".DateStrip_dayCtDate__u1AKh".to_string())
    );
    assert_eq!(
        Selector::from(".DateStrip_navButton__Zoc7Z.undefined"),
        Selector::Css(".DateStrip_navButton__Zoc7Z.undefined".to_string())
    );
    assert_eq!(
        Selector::from("#booking-root"),
        Selector::Css("#booking-root".to_string())
    );
}

#[test]
fn unknown_format_is_invalid_with_a_reason() {
    match Selector::from("Facials") {
        Selector::Invalid(reason) => assert!(reason.contains("Facials")),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn constructors_build_the_expected_variants() {
    assert_eq!(
        Selector::text("2:00 pm"),
        Selector::Text("2:00 pm".to_string())
    );
    assert_eq!(
        Selector::role("button", Some("No")),
        Selector::Role {
            role: "button".to_string(),
            name: Some("No".to_string()),
        }
    );
}
