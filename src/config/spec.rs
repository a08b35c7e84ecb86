//! Configuration specification types for the license manager.
//!
//! This module defines the structs that map to the `o365.licenses.yaml`
//! file. These types are declarative and fully describe the desired state:
//! which users carry which license SKUs, and which service plans are
//! disabled within each SKU.

use serde::{Deserialize, Serialize};

use crate::graph::LicenseAssignment;

/// The root configuration structure for a license deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicenseConfig {
    /// Tenant-level configuration.
    pub tenant: TenantConfig,
    /// Desired license assignments, one entry per user.
    #[serde(default)]
    pub users: Vec<UserLicenseConfig>,
}

/// Tenant-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantConfig {
    /// Display name used in logs and reports.
    pub name: String,
    /// Azure AD tenant ID. Falls back to the `O365_TENANT_ID` environment
    /// variable when omitted.
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Desired license state for a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserLicenseConfig {
    /// User principal name. This is the resource's sole identity key and is
    /// immutable once the assignment is under management.
    pub user_principal_name: String,
    /// Licenses the user should hold.
    #[serde(default)]
    pub licenses: Vec<LicenseAssignmentConfig>,
}

/// One desired license assignment within a user entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LicenseAssignmentConfig {
    /// SKU identifier of the license product.
    pub skuid: String,
    /// Service plans to disable within the SKU.
    #[serde(default)]
    pub disabled_plans: Vec<String>,
}

impl LicenseConfig {
    /// Returns the user principal names in declaration order.
    #[must_use]
    pub fn user_names(&self) -> Vec<&str> {
        self.users
            .iter()
            .map(|u| u.user_principal_name.as_str())
            .collect()
    }

    /// Returns the total number of license assignments across all users.
    #[must_use]
    pub fn total_assignments(&self) -> usize {
        self.users.iter().map(|u| u.licenses.len()).sum()
    }
}

impl UserLicenseConfig {
    /// Returns the SKU identifiers declared for this user.
    #[must_use]
    pub fn sku_ids(&self) -> Vec<&str> {
        self.licenses.iter().map(|l| l.skuid.as_str()).collect()
    }

    /// Projects the declared licenses into the Graph domain shape.
    #[must_use]
    pub fn to_assignments(&self) -> Vec<LicenseAssignment> {
        self.licenses.iter().map(LicenseAssignment::from).collect()
    }

    /// Builds a user entry back from observed assignments, used by Read and
    /// Import to project actual state into the desired-state shape.
    #[must_use]
    pub fn from_assignments(
        user_principal_name: impl Into<String>,
        assignments: &[LicenseAssignment],
    ) -> Self {
        Self {
            user_principal_name: user_principal_name.into(),
            licenses: assignments
                .iter()
                .map(|a| LicenseAssignmentConfig {
                    skuid: a.sku_id.clone(),
                    disabled_plans: a.disabled_plans.clone(),
                })
                .collect(),
        }
    }
}

impl From<&LicenseAssignmentConfig> for LicenseAssignment {
    fn from(config: &LicenseAssignmentConfig) -> Self {
        Self {
            sku_id: config.skuid.clone(),
            disabled_plans: config.disabled_plans.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_round_trips_through_assignments() {
        let user = UserLicenseConfig {
            user_principal_name: String::from("alice@contoso.com"),
            licenses: vec![LicenseAssignmentConfig {
                skuid: String::from("sku-1"),
                disabled_plans: vec![String::from("plan-b")],
            }],
        };

        let assignments = user.to_assignments();
        assert_eq!(assignments[0].sku_id, "sku-1");
        assert_eq!(assignments[0].disabled_plans, vec![String::from("plan-b")]);

        let rebuilt = UserLicenseConfig::from_assignments("alice@contoso.com", &assignments);
        assert_eq!(rebuilt, user);
    }

    #[test]
    fn test_total_assignments() {
        let config = LicenseConfig {
            tenant: TenantConfig {
                name: String::from("contoso"),
                tenant_id: None,
            },
            users: vec![
                UserLicenseConfig {
                    user_principal_name: String::from("a@contoso.com"),
                    licenses: vec![
                        LicenseAssignmentConfig {
                            skuid: String::from("sku-1"),
                            disabled_plans: vec![],
                        },
                        LicenseAssignmentConfig {
                            skuid: String::from("sku-2"),
                            disabled_plans: vec![],
                        },
                    ],
                },
                UserLicenseConfig {
                    user_principal_name: String::from("b@contoso.com"),
                    licenses: vec![],
                },
            ],
        };

        assert_eq!(config.total_assignments(), 2);
        assert_eq!(config.user_names(), vec!["a@contoso.com", "b@contoso.com"]);
    }
}
