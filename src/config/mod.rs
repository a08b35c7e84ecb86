//! Configuration module for the Office365 license manager.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `o365.licenses.yaml`
//! - Validation of configuration values
//! - Credential resolution from the environment

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TENANT_ID,
    find_config_file,
};
pub use spec::{LicenseAssignmentConfig, LicenseConfig, TenantConfig, UserLicenseConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
