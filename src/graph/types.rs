//! Microsoft Graph API types and data structures.
//!
//! This module defines the types used for communication with the Graph
//! license endpoints, plus the domain representation of a license
//! assignment shared by the config, diff, and reconciler layers.

use serde::{Deserialize, Serialize};

/// A license assignment: one SKU plus the service plans disabled within it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseAssignment {
    /// Opaque SKU identifier, unique within a user's assignment set.
    pub sku_id: String,
    /// Plan identifiers disabled within that SKU.
    #[serde(default)]
    pub disabled_plans: Vec<String>,
}

/// The add/remove mutation computed by reconciliation, consumed by a single
/// `assignLicense` call.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDelta {
    /// Licenses to (re-)assign. Desired SKUs are always resubmitted; the API
    /// treats an already-assigned SKU as an upsert of its disabled-plan set.
    pub add_licenses: Vec<LicenseAssignment>,
    /// SKU identifiers to remove.
    pub remove_licenses: Vec<String>,
}

/// Response wrapper for the `licenseDetails` collection.
#[derive(Debug, Deserialize)]
pub struct LicenseDetailsResponse {
    /// Assigned license details.
    pub value: Vec<LicenseDetail>,
}

/// A single entry from the `licenseDetails` collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDetail {
    /// SKU identifier of the assigned license.
    pub sku_id: String,
    /// Service plans contained in the SKU, with their provisioning status.
    #[serde(default)]
    pub service_plans: Vec<ServicePlanInfo>,
}

/// Provisioning information for one service plan within a SKU.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePlanInfo {
    /// Plan identifier.
    pub service_plan_id: String,
    /// Provisioning status (e.g. "Success", "Disabled", "PendingInput").
    #[serde(default)]
    pub provisioning_status: String,
}

/// `OData` error envelope returned by Graph on failure.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    /// Error body.
    pub error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    /// Machine-readable error code (e.g. `Request_ResourceNotFound`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl LicenseDetail {
    /// Projects this wire entry into the domain shape, deriving the
    /// disabled-plan set from plans whose provisioning status is `Disabled`.
    #[must_use]
    pub fn to_assignment(&self) -> LicenseAssignment {
        let disabled_plans = self
            .service_plans
            .iter()
            .filter(|p| p.provisioning_status == "Disabled")
            .map(|p| p.service_plan_id.clone())
            .collect();

        LicenseAssignment {
            sku_id: self.sku_id.clone(),
            disabled_plans,
        }
    }
}

impl LicenseAssignment {
    /// Creates an assignment with no disabled plans.
    #[must_use]
    pub const fn new(sku_id: String) -> Self {
        Self {
            sku_id,
            disabled_plans: Vec::new(),
        }
    }

    /// Adds a disabled plan.
    #[must_use]
    pub fn with_disabled_plan(mut self, plan_id: impl Into<String>) -> Self {
        self.disabled_plans.push(plan_id.into());
        self
    }
}

impl LicenseDelta {
    /// Creates a delta that only assigns licenses.
    #[must_use]
    pub fn add_only(add_licenses: Vec<LicenseAssignment>) -> Self {
        Self {
            add_licenses,
            remove_licenses: Vec::new(),
        }
    }

    /// Creates a delta that only removes licenses.
    #[must_use]
    pub fn remove_only(remove_licenses: Vec<String>) -> Self {
        Self {
            add_licenses: Vec::new(),
            remove_licenses,
        }
    }

    /// Returns true if the delta carries no work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_licenses.is_empty() && self.remove_licenses.is_empty()
    }
}

impl std::fmt::Display for LicenseDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to remove",
            self.add_licenses.len(),
            self.remove_licenses.len()
        )
    }
}
