//! Configuration parser for loading the desired-state file.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling. Client credentials
//! never live in the YAML file; they are read from the environment (with
//! `.env` support for local use).

use crate::error::{ConfigError, O365Error, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::LicenseConfig;

/// Environment variable holding the OAuth2 client ID.
pub const ENV_CLIENT_ID: &str = "O365_CLIENT_ID";

/// Environment variable holding the OAuth2 client secret.
pub const ENV_CLIENT_SECRET: &str = "O365_CLIENT_SECRET";

/// Environment variable holding the Azure AD tenant ID.
pub const ENV_TENANT_ID: &str = "O365_TENANT_ID";

/// Configuration parser for loading license configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LicenseConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(O365Error::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            O365Error::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<LicenseConfig> {
        debug!("Parsing YAML configuration");

        let config: LicenseConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            O365Error::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Successfully parsed configuration for tenant: {}",
            config.tenant.name
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// `O365_TENANT_ID` takes precedence over `tenant.tenant_id` in the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<LicenseConfig> {
        let mut config = self.load_file(path)?;

        if let Ok(tenant_id) = std::env::var(ENV_TENANT_ID) {
            debug!("Overriding tenant.tenant_id from environment");
            config.tenant.tenant_id = Some(tenant_id);
        }

        Ok(config)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                O365Error::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the OAuth2 client credentials from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is not set.
    pub fn get_client_credentials() -> Result<(String, String)> {
        let client_id = require_env(ENV_CLIENT_ID)?;
        let client_secret = require_env(ENV_CLIENT_SECRET)?;
        Ok((client_id, client_secret))
    }

    /// Resolves the tenant ID from configuration or environment.
    ///
    /// # Errors
    ///
    /// Returns an error if neither source provides one.
    pub fn get_tenant_id(config: &LicenseConfig) -> Result<String> {
        if let Some(tenant_id) = &config.tenant.tenant_id {
            return Ok(tenant_id.clone());
        }
        require_env(ENV_TENANT_ID)
    }
}

/// Reads a required environment variable.
fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| {
        O365Error::Config(ConfigError::MissingEnvVar {
            name: name.to_string(),
        })
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "o365.licenses.yaml",
    "o365.licenses.yml",
    "licenses.yaml",
    "licenses.yml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(O365Error::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
tenant:
  name: contoso
users: []
";
        let parser = ConfigParser::new();
        let result = parser.parse_yaml(yaml, None);
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config.tenant.name, "contoso");
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
tenant:
  name: contoso
  tenant_id: 11111111-2222-3333-4444-555555555555

users:
  - user_principal_name: alice@contoso.com
    licenses:
      - skuid: 6fd2c87f-b296-42f0-b197-1e91e994b900
        disabled_plans:
          - 5dbe027f-2339-4123-9542-606e4d348a72
      - skuid: c7df2760-2c81-4ef7-b578-5b5392b571df
  - user_principal_name: bob@contoso.com
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].licenses.len(), 2);
        assert_eq!(config.users[0].licenses[0].disabled_plans.len(), 1);
        assert!(config.users[1].licenses.is_empty());
        assert_eq!(config.total_assignments(), 2);
    }

    #[test]
    fn test_load_file_missing() {
        let parser = ConfigParser::new();
        let result = parser.load_file("/nonexistent/o365.licenses.yaml");
        assert!(matches!(
            result,
            Err(O365Error::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("o365.licenses.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "tenant:\n  name: contoso\nusers: []").unwrap();

        let parser = ConfigParser::new();
        let config = parser.load_file(&path).unwrap();
        assert_eq!(config.tenant.name, "contoso");
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("o365.licenses.yaml"), "tenant:\n  name: x\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("o365.licenses.yaml"));
    }
}
