//! Error types for the Office365 license manager.
//!
//! This module provides a comprehensive error hierarchy for all operations
//! in the license lifecycle: configuration, token acquisition, Microsoft
//! Graph API calls, and reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Office365 license manager.
#[derive(Debug, Error)]
pub enum O365Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token acquisition errors.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Microsoft Graph API errors.
    #[error("Graph API error: {0}")]
    Graph(#[from] GraphError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate {resource_type}: {name}")]
    DuplicateName {
        /// Type of resource (user, license, etc.).
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// Token acquisition errors from the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token request could not be sent.
    #[error("Token request transport failure: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// The token endpoint responded with a non-200 status.
    #[error("Token request failed with status {status}")]
    TokenRequestFailed {
        /// HTTP status code returned by the token endpoint.
        status: u16,
    },

    /// The token response body was not the expected JSON shape.
    #[error("Failed to decode token response: {message}")]
    Decode {
        /// Description of the decode error.
        message: String,
    },
}

/// Microsoft Graph API errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication was rejected by the API.
    #[error("Graph authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Graph API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("Graph API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The requested resource does not exist.
    #[error("Resource not found: {code} - {message}")]
    ResourceNotFound {
        /// OData error code reported by the API.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with Graph: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Graph API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An attempt was made to change the immutable resource identity.
    #[error("Can't update User Principal Name")]
    ImmutableField,

    /// Reconciliation failed for a specific user.
    #[error("Failed to reconcile licenses for '{user_principal_name}': {reason}")]
    UserReconcileFailed {
        /// User principal name of the failed resource.
        user_principal_name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Reconciliation was aborted.
    #[error("Reconciliation aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Result type alias for license manager operations.
pub type Result<T> = std::result::Result<T, O365Error>;

impl O365Error {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    ///
    /// This is the classifier the bounded-retry loop consults on every
    /// failed attempt: rate limits, transport failures, and gateway-class
    /// statuses keep the loop going, everything else aborts it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Graph(GraphError::RateLimited { .. } | GraphError::NetworkError { .. }) => true,
            Self::Graph(GraphError::ApiRequestFailed { status, .. }) => {
                matches!(*status, 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Graph(GraphError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Graph(GraphError::NetworkError { .. }) => Some(5),
            _ => None,
        }
    }

    /// Returns true if this error means the target resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Graph(GraphError::ResourceNotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl GraphError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_is_retryable() {
        let err = O365Error::Graph(GraphError::RateLimited {
            retry_after_secs: 30,
        });
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay_secs(), Some(30));
    }

    #[test]
    fn test_gateway_statuses_are_retryable() {
        for status in [502, 503, 504] {
            let err = O365Error::Graph(GraphError::api_error(status, "upstream"));
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
        let err = O365Error::Graph(GraphError::api_error(400, "bad request"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_is_terminal() {
        let err = O365Error::Graph(GraphError::ResourceNotFound {
            code: String::from("Request_ResourceNotFound"),
            message: String::from("missing"),
        });
        assert!(!err.is_retryable());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_immutable_field_message() {
        let err = O365Error::Reconcile(ReconcileError::ImmutableField);
        assert!(err.to_string().contains("Can't update User Principal Name"));
    }

    #[test]
    fn test_auth_error_embeds_status() {
        let err = O365Error::Auth(AuthError::TokenRequestFailed { status: 403 });
        assert!(err.to_string().contains("403"));
    }
}
