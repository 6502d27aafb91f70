//! In-process test doubles and fixtures for the booking flow.

mod interceptor_tests;
mod selector_tests;
mod wizard_tests;

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::driver::{ElementHandle, PageDriver};
use crate::errors::BookingError;
use crate::selector::Selector;

/// The date strip's forward control, as the widget classes it.
pub(crate) const NAV_CLASS: &str = "DateStrip_navButton__Zoc7Z";
pub(crate) const NAV_CLASS_EXTRA: &str = "undefined";
pub(crate) const DAY_CELL_CLASS: &str = "DateStrip_dayCtDate__u1AKh";
pub(crate) const NAV_LABEL: &str = "›";

/// One renderable element on a mock screen.
#[derive(Debug, Clone)]
pub(crate) struct MockElement {
    pub text: String,
    pub role: Option<String>,
    pub classes: Vec<String>,
}

impl MockElement {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            role: None,
            classes: Vec::new(),
        }
    }

    pub fn role(role: &str, text: &str) -> Self {
        Self {
            text: text.to_string(),
            role: Some(role.to_string()),
            classes: Vec::new(),
        }
    }

    pub fn classed(classes: &[&str], text: &str) -> Self {
        Self {
            text: text.to_string(),
            role: None,
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn nav_button() -> Self {
        Self::classed(&[NAV_CLASS, NAV_CLASS_EXTRA], NAV_LABEL)
    }

    pub fn day_cell(day: u32) -> Self {
        Self::classed(&[DAY_CELL_CLASS], &day.to_string())
    }
}

#[derive(Debug, Default)]
struct MockState {
    screens: Vec<Vec<MockElement>>,
    screen: usize,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    next_clicks: u32,
}

/// A scripted page: a sequence of screens where clicking the date
/// strip's "next" control advances to the following screen (and stays on
/// the last one). Every click and fill is journaled by element text.
#[derive(Debug)]
pub(crate) struct MockPage {
    state: Mutex<MockState>,
}

impl MockPage {
    pub fn with_screens(screens: Vec<Vec<MockElement>>) -> Self {
        Self {
            state: Mutex::new(MockState {
                screens,
                ..MockState::default()
            }),
        }
    }

    pub fn single(elements: Vec<MockElement>) -> Self {
        Self::with_screens(vec![elements])
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn next_clicks(&self) -> u32 {
        self.state.lock().unwrap().next_clicks
    }
}

fn element_matches(el: &MockElement, selector: &Selector) -> bool {
    match selector {
        Selector::Text(t) => el.text == *t,
        Selector::TextContains(t) => el.text.contains(t.as_str()),
        Selector::Role { role, name } => {
            el.role.as_deref() == Some(role.as_str())
                && name.as_ref().map_or(true, |n| el.text == *n)
        }
        Selector::Css(css) => {
            let wanted: Vec<&str> = css.split('.').filter(|p| !p.is_empty()).collect();
            !wanted.is_empty() && wanted.iter().all(|c| el.classes.iter().any(|k| k == c))
        }
        Selector::And(parts) => parts.iter().all(|p| element_matches(el, p)),
        Selector::Invalid(_) => false,
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn find_element(
        &self,
        selector: &Selector,
        _timeout: Duration,
    ) -> Result<ElementHandle, BookingError> {
        let state = self.state.lock().unwrap();
        let screen = &state.screens[state.screen];
        screen
            .iter()
            .find(|el| element_matches(el, selector))
            .map(|el| ElementHandle {
                object_id: el.text.clone(),
                text: Some(el.text.clone()),
            })
            .ok_or_else(|| BookingError::ElementNotFound(selector.to_string()))
    }

    async fn find_elements(
        &self,
        selector: &Selector,
        _timeout: Duration,
    ) -> Result<Vec<ElementHandle>, BookingError> {
        let state = self.state.lock().unwrap();
        let screen = &state.screens[state.screen];
        let matches: Vec<ElementHandle> = screen
            .iter()
            .filter(|el| element_matches(el, selector))
            .map(|el| ElementHandle {
                object_id: el.text.clone(),
                text: Some(el.text.clone()),
            })
            .collect();
        if matches.is_empty() {
            Err(BookingError::ElementNotFound(selector.to_string()))
        } else {
            Ok(matches)
        }
    }

    async fn click(&self, element: &ElementHandle, _force: bool) -> Result<(), BookingError> {
        let mut state = self.state.lock().unwrap();
        let is_nav = state.screens[state.screen]
            .iter()
            .any(|el| el.text == element.object_id && el.classes.iter().any(|c| c == NAV_CLASS));
        if is_nav {
            state.next_clicks += 1;
            if state.screen + 1 < state.screens.len() {
                state.screen += 1;
            }
        }
        state.clicks.push(element.object_id.clone());
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<(), BookingError> {
        let mut state = self.state.lock().unwrap();
        state
            .fills
            .push((element.object_id.clone(), text.to_string()));
        Ok(())
    }

    // The bounded navigation loops would otherwise sleep for real.
    async fn settle(&self, _duration: Duration) {}
}

/// The startup payload the catalog/interceptor/wizard tests share,
/// shaped like the widget's real response (with one dangling staff id).
pub(crate) fn startup_payload() -> Value {
    json!({
        "servicesInfo": {
            "serviceCategories": [
                { "id": 1, "name": "Facials" },
                { "id": 2, "name": "Massage" }
            ],
            "servicesById": {
                "101": {
                    "name": "HydraFacial FIRST TIME SPECIAL!",
                    "defaultPrice": 99.0,
                    "serviceCategoryId": 1
                },
                "102": {
                    "name": "Signature Facial",
                    "defaultPrice": 120.0,
                    "serviceCategoryId": 1
                },
                "201": {
                    "name": "Deep Tissue Massage",
                    "defaultPrice": 110.0,
                    "serviceCategoryId": 2
                }
            },
            "serviceOptionGroupIdsByServiceId": {
                "101": [11, 12]
            },
            "serviceOptionGroupsById": {
                "11": { "name": "Enhancements", "prompt": "Add an enhancement?" },
                "12": { "name": "Finishing touches", "prompt": "Anything else?" }
            },
            "serviceOptionsById": {
                "1001": { "name": "Extractions", "price": 25.0, "serviceOptionGroupId": 11 },
                "1002": { "name": "Dermaplaning", "price": 40.0, "serviceOptionGroupId": 12 },
                "1003": { "name": "LED Therapy", "price": 35.0, "serviceOptionGroupId": 11 }
            }
        },
        "staffInfo": {
            "staffById": {
                "7": { "firstName": "Elena", "lastName": "Rodriguez" },
                "8": { "firstName": "Jane", "lastName": "" }
            },
            "staffIdsByServiceId": {
                "101": [7, 8, 99]
            }
        }
    })
}

pub(crate) fn startup_url() -> String {
    "https://booking.example.com/api/booking/app/startup?location=1".to_string()
}
