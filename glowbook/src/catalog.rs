//! Passively captured catalog of the widget's service/add-on/staff
//! taxonomy.
//!
//! The widget loads its whole catalog in one startup response; nothing in
//! the rendered UI exposes ids or prices reliably, so the flow
//! reconstructs the taxonomy from that payload instead of scraping it.
//! The payload shape is externally owned and is not validated beyond the
//! lookups the queries need.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::Deserialize;

/// The intercepted startup payload. Captured once per session, immutable
/// thereafter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupData {
    #[serde(default)]
    pub services_info: ServicesInfo,
    #[serde(default)]
    pub staff_info: StaffInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesInfo {
    #[serde(default)]
    pub service_categories: Vec<ServiceCategory>,
    #[serde(default)]
    pub services_by_id: BTreeMap<String, Service>,
    #[serde(default)]
    pub service_option_group_ids_by_service_id: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    pub service_option_groups_by_id: BTreeMap<String, ServiceOptionGroup>,
    #[serde(default)]
    pub service_options_by_id: BTreeMap<String, ServiceOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffInfo {
    #[serde(default)]
    pub staff_by_id: BTreeMap<String, StaffMember>,
    #[serde(default)]
    pub staff_ids_by_service_id: BTreeMap<String, Vec<u64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategory {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub default_price: f64,
    pub service_category_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOptionGroup {
    pub name: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOption {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub service_option_group_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl StaffMember {
    /// Display name: the separating space and last name appear only when
    /// a non-empty last name exists.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// A service category, as displayed by the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub id: u64,
    pub name: String,
}

/// A bookable service within a category.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    pub price: f64,
}

/// An add-on group offered for a service, with its options.
#[derive(Debug, Clone, PartialEq)]
pub struct AddonGroup {
    pub id: u64,
    pub name: String,
    pub prompt: String,
    pub options: Vec<AddonOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddonOption {
    pub id: String,
    pub name: String,
    pub price: f64,
}

/// A staff member eligible for a service.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffSummary {
    pub id: u64,
    pub full_name: String,
}

/// Read-only query surface over the captured [`StartupData`].
///
/// Owned by the session and written once by the response interceptor
/// (last writer wins if the endpoint is hit again). Every query tolerates
/// an absent payload or an unmatched name by returning an empty result;
/// none of them fail. Duplicate display names resolve to the first match
/// in payload order, a documented limitation of the widget's catalog.
#[derive(Debug, Default)]
pub struct CatalogStore {
    data: RwLock<Option<StartupData>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a captured payload, replacing any previous capture.
    pub fn capture(&self, data: StartupData) {
        *self
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(data);
    }

    /// Whether the startup payload has been captured yet.
    pub fn is_captured(&self) -> bool {
        self.read().is_some()
    }

    /// All service categories, in payload order.
    pub fn categories(&self) -> Vec<CategorySummary> {
        let guard = self.read();
        let Some(data) = guard.as_ref() else {
            return Vec::new();
        };
        data.services_info
            .service_categories
            .iter()
            .map(|c| CategorySummary {
                id: c.id,
                name: c.name.clone(),
            })
            .collect()
    }

    /// Services belonging to the named category; empty for an unknown
    /// category name.
    pub fn services_in_category(&self, category_name: &str) -> Vec<ServiceSummary> {
        let guard = self.read();
        let Some(data) = guard.as_ref() else {
            return Vec::new();
        };
        let info = &data.services_info;

        let Some(category_id) = info
            .service_categories
            .iter()
            .find(|c| c.name == category_name)
            .map(|c| c.id)
        else {
            return Vec::new();
        };

        info.services_by_id
            .iter()
            .filter(|(_, service)| service.service_category_id == category_id)
            .map(|(id, service)| ServiceSummary {
                id: id.clone(),
                name: service.name.clone(),
                price: service.default_price,
            })
            .collect()
    }

    /// Add-on groups configured for the named service, each with its
    /// options. A service without option groups yields an empty vec.
    pub fn addons_for_service(&self, service_name: &str) -> Vec<AddonGroup> {
        let guard = self.read();
        let Some(data) = guard.as_ref() else {
            return Vec::new();
        };
        let info = &data.services_info;

        let Some(service_id) = Self::service_id_by_name(info, service_name) else {
            return Vec::new();
        };

        let group_ids = info
            .service_option_group_ids_by_service_id
            .get(&service_id)
            .cloned()
            .unwrap_or_default();

        group_ids
            .into_iter()
            .filter_map(|group_id| {
                // A dangling group id means the group is not offered.
                let group = info.service_option_groups_by_id.get(&group_id.to_string())?;
                let options = info
                    .service_options_by_id
                    .iter()
                    .filter(|(_, opt)| opt.service_option_group_id == group_id)
                    .map(|(id, opt)| AddonOption {
                        id: id.clone(),
                        name: opt.name.clone(),
                        price: opt.price,
                    })
                    .collect();
                Some(AddonGroup {
                    id: group_id,
                    name: group.name.clone(),
                    prompt: group.prompt.clone(),
                    options,
                })
            })
            .collect()
    }

    /// Staff eligible for the named service, in payload order.
    pub fn staff_for_service(&self, service_name: &str) -> Vec<StaffSummary> {
        let guard = self.read();
        let Some(data) = guard.as_ref() else {
            return Vec::new();
        };

        let Some(service_id) = Self::service_id_by_name(&data.services_info, service_name) else {
            return Vec::new();
        };

        let staff_ids = data
            .staff_info
            .staff_ids_by_service_id
            .get(&service_id)
            .cloned()
            .unwrap_or_default();

        staff_ids
            .into_iter()
            .filter_map(|staff_id| {
                let staff = data.staff_info.staff_by_id.get(&staff_id.to_string())?;
                Some(StaffSummary {
                    id: staff_id,
                    full_name: staff.full_name(),
                })
            })
            .collect()
    }

    fn service_id_by_name(info: &ServicesInfo, name: &str) -> Option<String> {
        info.services_by_id
            .iter()
            .find(|(_, service)| service.name == name)
            .map(|(id, _)| id.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<StartupData>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }
}
