//! End-to-end tests for the booking state machine.

use std::sync::Arc;

use super::{startup_payload, startup_url, MockElement, MockPage};
use crate::errors::BookingError;
use crate::wizard::{BookingSelection, BookingWizard, WizardState, WizardStep};
use crate::BookingSession;

fn selection() -> BookingSelection {
    BookingSelection {
        first_name: "Ross".to_string(),
        last_name: "Massey".to_string(),
        phone: "123456".to_string(),
        email: "ross@ross.com".to_string(),
        category: "Facials".to_string(),
        sub_service: "HydraFacial FIRST TIME SPECIAL!".to_string(),
        addons: vec!["Extractions".to_string(), "Dermaplaning".to_string()],
        staff: Some("Elena".to_string()),
        day: 15,
        month: 8,
        year: 2025,
        time: "2:00 pm".to_string(),
    }
}

/// Every screen of the widget at once; the flow only ever looks for the
/// element its current step needs.
fn booking_screen() -> Vec<MockElement> {
    vec![
        MockElement::text("Facials"),
        MockElement::text("Massage"),
        MockElement::text("HydraFacial FIRST TIME SPECIAL!"),
        MockElement::text("Extractions"),
        MockElement::text("Dermaplaning"),
        MockElement::role("button", "Continue"),
        MockElement::text("Elena"),
        MockElement::text("Anyone"),
        MockElement::role("button", "No"),
        MockElement::text("August 2025"),
        MockElement::nav_button(),
        MockElement::day_cell(15),
        MockElement::text("Afternoon: 4 available"),
        MockElement::text("2:00 pm"),
        MockElement::role("textbox", "First name"),
        MockElement::role("textbox", "Last name"),
        MockElement::role("textbox", "Phone number"),
        MockElement::role("textbox", "Email"),
        MockElement::text("I agree to the cancellation policy"),
        MockElement::role("textbox", "Comments"),
    ]
}

fn session_over(page: Arc<MockPage>) -> BookingSession {
    let session = BookingSession::new(page);
    session
        .interceptor()
        .handle_response(&startup_url(), &startup_payload());
    session
}

#[tokio::test]
async fn full_flow_reaches_form_filled_in_order() {
    let page = Arc::new(MockPage::single(booking_screen()));
    let session = session_over(page.clone());

    let state = session.make_appointment(&selection()).await.unwrap();

    assert_eq!(state, WizardState::FormFilled);
    assert_eq!(
        page.clicks(),
        [
            "Facials",
            "HydraFacial FIRST TIME SPECIAL!",
            "Extractions",
            "Dermaplaning",
            "Continue",
            "Elena",
            "No",
            "15",
            "Afternoon: 4 available",
            "2:00 pm",
            "I agree to the cancellation policy",
        ]
    );
    assert_eq!(
        page.fills(),
        [
            ("First name".to_string(), "Ross".to_string()),
            ("Last name".to_string(), "Massey".to_string()),
            ("Phone number".to_string(), "123456".to_string()),
            ("Email".to_string(), "ross@ross.com".to_string()),
            ("Comments".to_string(), "automated".to_string()),
        ]
    );
}

#[tokio::test]
async fn empty_addons_degrade_to_a_bare_continue() {
    let page = Arc::new(MockPage::single(booking_screen()));
    let session = session_over(page.clone());
    let mut selection = selection();
    selection.addons.clear();

    let state = session.make_appointment(&selection).await.unwrap();

    assert_eq!(state, WizardState::FormFilled);
    let clicks = page.clicks();
    assert!(clicks.contains(&"Continue".to_string()));
    assert!(!clicks.contains(&"Extractions".to_string()));
}

#[tokio::test]
async fn no_staff_preference_selects_anyone() {
    let page = Arc::new(MockPage::single(booking_screen()));
    let session = session_over(page.clone());
    let mut selection = selection();
    selection.staff = None;

    session.make_appointment(&selection).await.unwrap();

    let clicks = page.clicks();
    let anyone = clicks.iter().position(|c| c == "Anyone").unwrap();
    let no = clicks.iter().position(|c| c == "No").unwrap();
    assert!(anyone < no, "the dialog is dismissed after staff selection");
    assert!(!clicks.contains(&"Elena".to_string()));
}

#[tokio::test]
async fn missing_category_aborts_naming_the_step() {
    let mut screen = booking_screen();
    screen.retain(|el| el.text != "Facials");
    let page = Arc::new(MockPage::single(screen));
    let session = session_over(page.clone());
    let catalog = session.catalog();

    let mut wizard = BookingWizard::new(page.clone(), catalog);
    let err = wizard.run(&selection()).await.unwrap_err();

    assert!(matches!(
        err,
        BookingError::StepFailed {
            step: WizardStep::Category,
            ..
        }
    ));
    assert_eq!(wizard.state(), WizardState::Start);
    assert!(page.clicks().is_empty());
}

#[tokio::test]
async fn unavailable_slot_does_not_abort_the_flow() {
    let mut screen = booking_screen();
    screen.retain(|el| el.text != "2:00 pm");
    let page = Arc::new(MockPage::single(screen));
    let session = session_over(page.clone());

    let state = session.make_appointment(&selection()).await.unwrap();

    assert_eq!(state, WizardState::FormFilled);
    assert!(!page.clicks().contains(&"2:00 pm".to_string()));
}

#[tokio::test]
async fn exhausted_calendar_still_reaches_the_form() {
    // Neither the month header nor the day cell ever shows; the bounded
    // searches give up and the flow carries on best-effort.
    let mut screen = booking_screen();
    screen.retain(|el| el.text != "August 2025" && el.text != "15");
    let page = Arc::new(MockPage::single(screen));
    let session = session_over(page.clone());

    let state = session.make_appointment(&selection()).await.unwrap();

    assert_eq!(state, WizardState::FormFilled);
    assert_eq!(page.next_clicks(), 38);
}

#[tokio::test]
async fn missing_confirmation_dialog_fails_the_staff_step() {
    let mut screen = booking_screen();
    screen.retain(|el| el.text != "No");
    let page = Arc::new(MockPage::single(screen));
    let session = session_over(page.clone());

    let err = session.make_appointment(&selection()).await.unwrap_err();

    assert!(matches!(
        err,
        BookingError::StepFailed {
            step: WizardStep::Staff,
            ..
        }
    ));
}
