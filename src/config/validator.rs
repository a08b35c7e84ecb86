//! Configuration validation for license specs.
//!
//! The loosely-typed original accessed every field through unchecked
//! assertions at each call site; here the whole document is validated once,
//! before anything talks to the API.

use crate::error::{ConfigError, O365Error, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{LicenseConfig, UserLicenseConfig};

/// Validator for license configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a license configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self, config: &LicenseConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_tenant(config, &mut result);
        Self::validate_users(&config.users, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(O365Error::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates tenant configuration.
    fn validate_tenant(config: &LicenseConfig, result: &mut ValidationResult) {
        if config.tenant.name.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("tenant.name"),
                message: String::from("Tenant name cannot be empty"),
            });
        }

        if let Some(tenant_id) = &config.tenant.tenant_id
            && !is_guid(tenant_id)
        {
            result.warnings.push(format!(
                "tenant.tenant_id '{tenant_id}' does not look like a GUID"
            ));
        }
    }

    /// Validates all user entries.
    fn validate_users(users: &[UserLicenseConfig], result: &mut ValidationResult) {
        if users.is_empty() {
            result
                .warnings
                .push(String::from("No users defined in configuration"));
            return;
        }

        let mut seen_users = HashSet::new();

        for (i, user) in users.iter().enumerate() {
            let upn = &user.user_principal_name;
            let field_prefix = format!("users[{i}]");

            if upn.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{field_prefix}.user_principal_name"),
                    message: String::from("User principal name cannot be empty"),
                });
                continue;
            }

            if !upn.contains('@') {
                result.errors.push(ValidationError {
                    field: format!("{field_prefix}.user_principal_name"),
                    message: format!(
                        "User principal name '{upn}' is invalid. Expected user@domain form."
                    ),
                });
            }

            if !seen_users.insert(upn.as_str()) {
                result.errors.push(ValidationError {
                    field: format!("{field_prefix}.user_principal_name"),
                    message: format!("Duplicate user: {upn}"),
                });
            }

            Self::validate_licenses(user, &field_prefix, result);
        }
    }

    /// Validates the license entries of a single user.
    fn validate_licenses(
        user: &UserLicenseConfig,
        field_prefix: &str,
        result: &mut ValidationResult,
    ) {
        if user.licenses.is_empty() {
            result.warnings.push(format!(
                "User '{}' has no licenses declared; apply will assign nothing",
                user.user_principal_name
            ));
            return;
        }

        let mut seen_skus = HashSet::new();

        for (j, license) in user.licenses.iter().enumerate() {
            let field = format!("{field_prefix}.licenses[{j}].skuid");

            if license.skuid.is_empty() {
                result.errors.push(ValidationError {
                    field,
                    message: String::from("SKU identifier cannot be empty"),
                });
                continue;
            }

            if !seen_skus.insert(license.skuid.as_str()) {
                result.errors.push(ValidationError {
                    field,
                    message: format!(
                        "Duplicate SKU '{}' for user '{}'",
                        license.skuid, user.user_principal_name
                    ),
                });
                continue;
            }

            if !is_guid(&license.skuid) {
                result
                    .warnings
                    .push(format!("SKU '{}' does not look like a GUID", license.skuid));
            }

            for plan in &license.disabled_plans {
                if plan.is_empty() {
                    result.errors.push(ValidationError {
                        field: format!("{field_prefix}.licenses[{j}].disabled_plans"),
                        message: String::from("Disabled plan identifier cannot be empty"),
                    });
                }
            }
        }
    }
}

/// Checks whether a string is shaped like a GUID (8-4-4-4-12 hex groups).
fn is_guid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8usize, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}
