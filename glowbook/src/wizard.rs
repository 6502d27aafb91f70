//! The sequential booking flow, as an explicit state machine.
//!
//! One transition per widget screen, executed strictly in order. A step
//! that cannot find its element is a hard stop naming the step; only the
//! date/time step tolerates misses internally, through the bounded
//! calendar and slot searches.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{CalendarNavigator, SearchOutcome};
use crate::catalog::CatalogStore;
use crate::driver::{PageDriver, DEFAULT_WAIT_TIMEOUT};
use crate::errors::BookingError;
use crate::locator::Locator;
use crate::selector::Selector;
use crate::timeslot::{SlotOutcome, TimeSlotSelector};

/// Everything the caller supplies for one booking attempt.
///
/// Name-based fields are matched by exact display text; `staff: None`
/// means "no preference" and selects the widget's "Anyone" option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSelection {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub category: String,
    pub sub_service: String,
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default)]
    pub staff: Option<String>,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub time: String,
}

/// Where the flow currently stands. `FormFilled` is the completed
/// terminal state; an aborted flow surfaces as an error naming the step
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Start,
    CategorySelected,
    SubServiceSelected,
    AddonsSelected,
    StaffSelected,
    DateTimeSelected,
    FormFilled,
}

/// The transition out of each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Category,
    SubService,
    Addons,
    Staff,
    DateTime,
    CustomerForm,
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WizardStep::Category => "category",
            WizardStep::SubService => "sub-service",
            WizardStep::Addons => "add-ons",
            WizardStep::Staff => "staff",
            WizardStep::DateTime => "date/time",
            WizardStep::CustomerForm => "customer form",
        })
    }
}

/// The step that leaves `state`, or `None` once the flow is complete.
fn next_step(state: WizardState) -> Option<WizardStep> {
    match state {
        WizardState::Start => Some(WizardStep::Category),
        WizardState::CategorySelected => Some(WizardStep::SubService),
        WizardState::SubServiceSelected => Some(WizardStep::Addons),
        WizardState::AddonsSelected => Some(WizardStep::Staff),
        WizardState::StaffSelected => Some(WizardStep::DateTime),
        WizardState::DateTimeSelected => Some(WizardStep::CustomerForm),
        WizardState::FormFilled => None,
    }
}

/// Drives the widget through the full booking sequence.
pub struct BookingWizard {
    driver: Arc<dyn PageDriver>,
    catalog: Arc<CatalogStore>,
    calendar: CalendarNavigator,
    slots: TimeSlotSelector,
    timeout: Duration,
    state: WizardState,
}

impl BookingWizard {
    pub fn new(driver: Arc<dyn PageDriver>, catalog: Arc<CatalogStore>) -> Self {
        Self {
            calendar: CalendarNavigator::new(driver.clone()),
            slots: TimeSlotSelector::new(driver.clone()),
            driver,
            catalog,
            timeout: DEFAULT_WAIT_TIMEOUT,
            state: WizardState::Start,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Run every remaining transition in order.
    ///
    /// Returns the terminal [`WizardState::FormFilled`] on success. The
    /// first failing step aborts the flow with
    /// [`BookingError::StepFailed`]; progress already made inside the
    /// widget is not rolled back.
    #[instrument(skip(self, selection), fields(category = %selection.category, service = %selection.sub_service))]
    pub async fn run(&mut self, selection: &BookingSelection) -> Result<WizardState, BookingError> {
        while let Some(step) = next_step(self.state) {
            debug!(%step, state = ?self.state, "entering step");
            self.transition(step, selection)
                .await
                .map_err(|e| e.in_step(step))?;
        }
        info!("booking flow completed");
        Ok(self.state)
    }

    async fn transition(
        &mut self,
        step: WizardStep,
        selection: &BookingSelection,
    ) -> Result<(), BookingError> {
        match step {
            WizardStep::Category => {
                self.log_categories();
                self.select_category(&selection.category).await?;
                self.state = WizardState::CategorySelected;
            }
            WizardStep::SubService => {
                self.log_services(&selection.category);
                self.select_sub_service(&selection.sub_service).await?;
                self.state = WizardState::SubServiceSelected;
            }
            WizardStep::Addons => {
                self.log_addons(&selection.sub_service);
                self.select_addons(&selection.addons).await?;
                self.state = WizardState::AddonsSelected;
            }
            WizardStep::Staff => {
                self.log_staff(&selection.sub_service);
                self.select_staff(selection.staff.as_deref()).await?;
                self.state = WizardState::StaffSelected;
            }
            WizardStep::DateTime => {
                self.select_datetime(selection).await?;
                self.state = WizardState::DateTimeSelected;
            }
            WizardStep::CustomerForm => {
                self.fill_customer_form(selection).await?;
                self.state = WizardState::FormFilled;
            }
        }
        Ok(())
    }

    async fn select_category(&self, category: &str) -> Result<(), BookingError> {
        info!(category, "selecting service category");
        self.locator(Selector::text(category)).click(None).await
    }

    async fn select_sub_service(&self, sub_service: &str) -> Result<(), BookingError> {
        info!(sub_service, "selecting sub-service");
        self.locator(Selector::text(sub_service)).click(None).await
    }

    /// With no add-ons requested the screen still demands an explicit
    /// confirmation, so the step degrades to clicking "Continue".
    async fn select_addons(&self, addons: &[String]) -> Result<(), BookingError> {
        if addons.is_empty() {
            info!("no add-ons requested, continuing");
            return self.click_continue().await;
        }

        for addon in addons {
            info!(addon = %addon, "selecting add-on");
            self.locator(Selector::text(addon)).force_click(None).await?;
        }

        // Let the toggle animations land before confirming.
        self.driver.settle(Duration::from_secs(1)).await;
        self.click_continue().await
    }

    async fn click_continue(&self) -> Result<(), BookingError> {
        self.locator(Selector::role("button", Some("Continue")))
            .click(None)
            .await
    }

    async fn select_staff(&self, staff: Option<&str>) -> Result<(), BookingError> {
        let label = staff.unwrap_or("Anyone");
        info!(staff = label, "selecting staff");
        self.locator(Selector::text(label)).click(None).await?;

        // The widget raises an upsell dialog after staff selection;
        // decline it before the calendar will show.
        self.locator(Selector::role("button", Some("No")))
            .click(None)
            .await
    }

    /// The one step with internal tolerance: exhausted searches and an
    /// unavailable slot are logged and the flow proceeds.
    async fn select_datetime(&self, selection: &BookingSelection) -> Result<(), BookingError> {
        let navigation = self
            .calendar
            .navigate_to_date(selection.day, selection.month, selection.year)
            .await?;

        if let SearchOutcome::Exhausted { attempts } = navigation.month {
            warn!(attempts, "proceeding without a confirmed month header");
        }
        if let SearchOutcome::Exhausted { attempts } = navigation.day {
            warn!(attempts, "proceeding without a selected day");
        }

        match self.slots.select_time(&selection.time).await? {
            SlotOutcome::Selected => {}
            SlotOutcome::Unavailable => {
                warn!(time = %selection.time, "proceeding without a selected slot");
            }
        }
        Ok(())
    }

    async fn fill_customer_form(&self, selection: &BookingSelection) -> Result<(), BookingError> {
        info!(
            first_name = %selection.first_name,
            last_name = %selection.last_name,
            "filling customer form"
        );

        self.locator(Selector::role("textbox", Some("First name")))
            .fill(&selection.first_name, None)
            .await?;
        self.locator(Selector::role("textbox", Some("Last name")))
            .fill(&selection.last_name, None)
            .await?;
        self.locator(Selector::role("textbox", Some("Phone number")))
            .fill(&selection.phone, None)
            .await?;
        self.locator(Selector::role("textbox", Some("Email")))
            .fill(&selection.email, None)
            .await?;

        // The rendered label continues past this prefix.
        self.locator(Selector::text_contains("I agree to the cancellation"))
            .click(None)
            .await?;

        self.locator(Selector::role("textbox", Some("Comments")))
            .fill("automated", None)
            .await
    }

    fn locator(&self, selector: Selector) -> Locator {
        Locator::new(self.driver.clone(), selector).set_default_timeout(self.timeout)
    }

    fn log_categories(&self) {
        let categories = self.catalog.categories();
        info!(total = categories.len(), "service categories");
        for category in &categories {
            debug!(id = category.id, name = %category.name, "category");
        }
    }

    fn log_services(&self, category: &str) {
        let services = self.catalog.services_in_category(category);
        info!(category, total = services.len(), "services in category");
        for service in &services {
            debug!(id = %service.id, name = %service.name, price = service.price, "service");
        }
    }

    fn log_addons(&self, sub_service: &str) {
        let groups = self.catalog.addons_for_service(sub_service);
        info!(sub_service, total = groups.len(), "add-on groups");
        for group in &groups {
            debug!(id = group.id, name = %group.name, prompt = %group.prompt, "group");
            for option in &group.options {
                debug!(id = %option.id, name = %option.name, price = option.price, "option");
            }
        }
    }

    fn log_staff(&self, sub_service: &str) {
        let staff = self.catalog.staff_for_service(sub_service);
        info!(sub_service, total = staff.len(), "eligible staff");
        for member in &staff {
            debug!(id = member.id, name = %member.full_name, "staff");
        }
    }
}
