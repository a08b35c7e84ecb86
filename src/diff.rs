//! Delta engine for comparing desired vs actual license assignments.
//!
//! The comparison key is the SKU identifier alone: a SKU present in actual
//! state but absent from desired state is removed, and every desired SKU is
//! resubmitted as an add (the API upserts disabled-plan changes for SKUs
//! that are already assigned).

use std::collections::HashSet;
use tracing::debug;

use crate::graph::{LicenseAssignment, LicenseDelta};

/// Engine for computing license deltas between desired and actual state.
#[derive(Debug, Default)]
pub struct DeltaEngine;

/// Type of difference detected for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffType {
    /// User has no assignments yet; everything will be assigned.
    Create,
    /// Assignments exist but differ from the declaration.
    Update,
    /// Assignments match the declaration.
    NoChange,
}

/// Human-readable difference summary for a single user.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserLicenseDiff {
    /// User principal name.
    pub user_principal_name: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// SKUs that would be newly assigned.
    pub added: Vec<String>,
    /// SKUs that would be removed.
    pub removed: Vec<String>,
    /// SKUs present on both sides but with differing disabled-plan sets.
    pub plan_changes: Vec<String>,
    /// SKUs present on both sides and identical.
    pub unchanged: usize,
}

impl DeltaEngine {
    /// Creates a new delta engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds the delta for a create: every desired entry becomes an add,
    /// nothing is removed. There is no prior state to diff against.
    #[must_use]
    pub fn delta_for_create(&self, desired: &[LicenseAssignment]) -> LicenseDelta {
        LicenseDelta::add_only(desired.to_vec())
    }

    /// Builds the delta for an update.
    ///
    /// Remove is the set difference by SKU id: every SKU assigned in actual
    /// state but absent from the desired set. Add is the entire desired set,
    /// resubmitted unconditionally.
    #[must_use]
    pub fn delta_for_update(
        &self,
        desired: &[LicenseAssignment],
        actual: &[LicenseAssignment],
    ) -> LicenseDelta {
        let desired_skus: HashSet<&str> = desired.iter().map(|d| d.sku_id.as_str()).collect();

        let remove_licenses: Vec<String> = actual
            .iter()
            .filter(|a| !desired_skus.contains(a.sku_id.as_str()))
            .map(|a| a.sku_id.clone())
            .collect();

        debug!(
            "Computed delta: {} add(s), {} remove(s)",
            desired.len(),
            remove_licenses.len()
        );

        LicenseDelta {
            add_licenses: desired.to_vec(),
            remove_licenses,
        }
    }

    /// Builds the delta for a delete: full teardown of every assigned SKU.
    #[must_use]
    pub fn delta_for_delete(&self, actual: &[LicenseAssignment]) -> LicenseDelta {
        LicenseDelta::remove_only(actual.iter().map(|a| a.sku_id.clone()).collect())
    }

    /// Computes a difference summary for display (plan/drift commands).
    #[must_use]
    pub fn diff(
        &self,
        user_principal_name: &str,
        desired: &[LicenseAssignment],
        actual: &[LicenseAssignment],
    ) -> UserLicenseDiff {
        let actual_skus: HashSet<&str> = actual.iter().map(|a| a.sku_id.as_str()).collect();
        let desired_skus: HashSet<&str> = desired.iter().map(|d| d.sku_id.as_str()).collect();

        let added: Vec<String> = desired
            .iter()
            .filter(|d| !actual_skus.contains(d.sku_id.as_str()))
            .map(|d| d.sku_id.clone())
            .collect();

        let removed: Vec<String> = actual
            .iter()
            .filter(|a| !desired_skus.contains(a.sku_id.as_str()))
            .map(|a| a.sku_id.clone())
            .collect();

        let mut plan_changes = Vec::new();
        let mut unchanged = 0;

        for d in desired {
            if let Some(a) = actual.iter().find(|a| a.sku_id == d.sku_id) {
                let mut want: Vec<&str> = d.disabled_plans.iter().map(String::as_str).collect();
                let mut have: Vec<&str> = a.disabled_plans.iter().map(String::as_str).collect();
                want.sort_unstable();
                have.sort_unstable();

                if want == have {
                    unchanged += 1;
                } else {
                    plan_changes.push(d.sku_id.clone());
                }
            }
        }

        let diff_type = if added.is_empty() && removed.is_empty() && plan_changes.is_empty() {
            DiffType::NoChange
        } else if actual.is_empty() {
            DiffType::Create
        } else {
            DiffType::Update
        };

        UserLicenseDiff {
            user_principal_name: user_principal_name.to_string(),
            diff_type,
            added,
            removed,
            plan_changes,
            unchanged,
        }
    }
}

impl UserLicenseDiff {
    /// Returns true if this user requires any change.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.diff_type != DiffType::NoChange
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(id: &str) -> LicenseAssignment {
        LicenseAssignment::new(String::from(id))
    }

    #[test]
    fn test_remove_is_set_difference_by_sku() {
        // A = {SKU1, SKU2}, D = {SKU1, SKU3} -> remove = {SKU2}, add = {SKU1, SKU3}
        let actual = vec![sku("SKU1"), sku("SKU2")];
        let desired = vec![sku("SKU1"), sku("SKU3")];

        let delta = DeltaEngine::new().delta_for_update(&desired, &actual);

        assert_eq!(delta.remove_licenses, vec![String::from("SKU2")]);
        assert_eq!(
            delta
                .add_licenses
                .iter()
                .map(|a| a.sku_id.as_str())
                .collect::<Vec<_>>(),
            vec!["SKU1", "SKU3"]
        );
    }

    #[test]
    fn test_unchanged_input_yields_no_removals() {
        let state = vec![sku("SKU1"), sku("SKU2")];

        let delta = DeltaEngine::new().delta_for_update(&state, &state);

        assert!(delta.remove_licenses.is_empty());
        assert_eq!(delta.add_licenses, state);
    }

    #[test]
    fn test_no_removals_when_desired_superset_of_actual() {
        let actual = vec![sku("SKU1")];
        let desired = vec![sku("SKU1"), sku("SKU2"), sku("SKU3")];

        let delta = DeltaEngine::new().delta_for_update(&desired, &actual);
        assert!(delta.remove_licenses.is_empty());
    }

    #[test]
    fn test_create_delta_is_add_only() {
        // A = {}, D = {SKU1} -> add = {SKU1}, remove empty
        let desired = vec![sku("SKU1")];

        let delta = DeltaEngine::new().delta_for_create(&desired);

        assert_eq!(delta.add_licenses, desired);
        assert!(delta.remove_licenses.is_empty());
    }

    #[test]
    fn test_delete_delta_removes_everything() {
        let actual = vec![sku("SKU1"), sku("SKU2")];

        let delta = DeltaEngine::new().delta_for_delete(&actual);

        assert!(delta.add_licenses.is_empty());
        assert_eq!(
            delta.remove_licenses,
            vec![String::from("SKU1"), String::from("SKU2")]
        );
    }

    #[test]
    fn test_disabled_plan_comparison_ignores_order() {
        let desired = vec![
            sku("SKU1")
                .with_disabled_plan("plan-a")
                .with_disabled_plan("plan-b"),
        ];
        let actual = vec![
            sku("SKU1")
                .with_disabled_plan("plan-b")
                .with_disabled_plan("plan-a"),
        ];

        let diff = DeltaEngine::new().diff("alice@contoso.com", &desired, &actual);
        assert_eq!(diff.diff_type, DiffType::NoChange);
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn test_plan_change_detected_as_update() {
        let desired = vec![sku("SKU1").with_disabled_plan("plan-a")];
        let actual = vec![sku("SKU1")];

        let diff = DeltaEngine::new().diff("alice@contoso.com", &desired, &actual);
        assert_eq!(diff.diff_type, DiffType::Update);
        assert_eq!(diff.plan_changes, vec![String::from("SKU1")]);
        assert!(diff.has_changes());
    }

    #[test]
    fn test_empty_actual_is_create() {
        let desired = vec![sku("SKU1")];
        let diff = DeltaEngine::new().diff("alice@contoso.com", &desired, &[]);
        assert_eq!(diff.diff_type, DiffType::Create);
        assert_eq!(diff.added, vec![String::from("SKU1")]);
    }
}
