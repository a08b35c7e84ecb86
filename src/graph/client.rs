//! Microsoft Graph API client implementation.
//!
//! This module provides the HTTP client for the Graph license endpoints and
//! the narrow [`LicenseApi`] interface the reconciler depends on.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{GraphError, O365Error, Result};

use super::types::{LicenseAssignment, LicenseDelta, LicenseDetailsResponse, ODataError};

/// Graph API base URL.
const GRAPH_API_URL: &str = "https://graph.microsoft.com/v1.0";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default rate-limit retry hint when the API omits `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Narrow license-management interface consumed by the reconciler.
///
/// Kept as a trait so the reconciliation logic can be exercised against a
/// mock without a live tenant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LicenseApi: Send + Sync {
    /// Fetches the licenses currently assigned to a user.
    async fn get_license_details(
        &self,
        user_principal_name: &str,
    ) -> Result<Vec<LicenseAssignment>>;

    /// Applies an add/remove license delta to a user in a single call.
    ///
    /// The API is an upsert for SKUs already assigned: re-adding a SKU with a
    /// changed disabled-plan set replaces that set.
    async fn assign_licenses(&self, user_principal_name: &str, delta: &LicenseDelta)
    -> Result<()>;
}

/// Microsoft Graph API client.
#[derive(Debug, Clone)]
pub struct GraphClient {
    /// HTTP client.
    client: Client,
    /// Authorization header value (`"Bearer <token>"`).
    bearer_token: String,
    /// Graph API base URL.
    base_url: String,
}

impl GraphClient {
    /// Creates a new Graph API client.
    ///
    /// `bearer_token` is used verbatim as the `Authorization` header value,
    /// matching what [`crate::graph::TokenFetcher::fetch_bearer`] returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(bearer_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GraphError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            bearer_token: bearer_token.into(),
            base_url: String::from(GRAPH_API_URL),
        })
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(bearer_token: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GraphError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            bearer_token: bearer_token.into(),
            base_url: String::from(GRAPH_API_URL),
        })
    }

    /// Overrides the Graph API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Maps a non-success response to the error taxonomy.
    ///
    /// `OData` error bodies are parsed structurally; a code containing
    /// `ResourceNotFound` maps to [`GraphError::ResourceNotFound`] rather
    /// than relying on message text.
    async fn error_from_response(response: Response) -> O365Error {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return O365Error::Graph(GraphError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return O365Error::Graph(GraphError::AuthenticationFailed {
                message: String::from("Bearer token rejected"),
            });
        }

        let body = response.text().await.unwrap_or_default();

        if let Ok(odata) = serde_json::from_str::<ODataError>(&body) {
            if odata.error.code.contains("ResourceNotFound") {
                return O365Error::Graph(GraphError::ResourceNotFound {
                    code: odata.error.code,
                    message: odata.error.message,
                });
            }
            return O365Error::Graph(GraphError::ApiRequestFailed {
                status: status.as_u16(),
                message: format!("{}: {}", odata.error.code, odata.error.message),
            });
        }

        O365Error::Graph(GraphError::api_error(status.as_u16(), body))
    }
}

#[async_trait]
impl LicenseApi for GraphClient {
    async fn get_license_details(
        &self,
        user_principal_name: &str,
    ) -> Result<Vec<LicenseAssignment>> {
        let url = format!("{}/users/{}/licenseDetails", self.base_url, user_principal_name);
        trace!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, &self.bearer_token)
            .send()
            .await
            .map_err(|e| GraphError::network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let details: LicenseDetailsResponse = response.json().await.map_err(|e| {
            O365Error::Graph(GraphError::InvalidResponse {
                message: format!("Failed to parse licenseDetails response: {e}"),
            })
        })?;

        let assignments: Vec<LicenseAssignment> =
            details.value.iter().map(|d| d.to_assignment()).collect();

        debug!(
            "User {user_principal_name} has {} assigned license(s)",
            assignments.len()
        );
        Ok(assignments)
    }

    async fn assign_licenses(
        &self,
        user_principal_name: &str,
        delta: &LicenseDelta,
    ) -> Result<()> {
        let url = format!("{}/users/{}/assignLicense", self.base_url, user_principal_name);
        debug!("Assigning licenses for {user_principal_name}: {delta}");

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, &self.bearer_token)
            .header(header::CONTENT_TYPE, "application/json")
            .json(delta)
            .send()
            .await
            .map_err(|e| GraphError::network(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GraphClient {
        GraphClient::new("Bearer test-token")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_get_license_details_parses_assignments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/alice@contoso.com/licenseDetails"))
            .and(header_matcher("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    {
                        "skuId": "sku-1",
                        "servicePlans": [
                            {"servicePlanId": "plan-a", "provisioningStatus": "Success"},
                            {"servicePlanId": "plan-b", "provisioningStatus": "Disabled"}
                        ]
                    },
                    {"skuId": "sku-2", "servicePlans": []}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let assignments = client
            .get_license_details("alice@contoso.com")
            .await
            .unwrap();

        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].sku_id, "sku-1");
        assert_eq!(assignments[0].disabled_plans, vec![String::from("plan-b")]);
        assert!(assignments[1].disabled_plans.is_empty());
    }

    #[tokio::test]
    async fn test_get_license_details_maps_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/ghost@contoso.com/licenseDetails"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "code": "Request_ResourceNotFound",
                    "message": "Resource 'ghost@contoso.com' does not exist."
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get_license_details("ghost@contoso.com")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_honors_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/alice@contoso.com/licenseDetails"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get_license_details("alice@contoso.com")
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(err.retry_delay_secs(), Some(17));
    }

    #[tokio::test]
    async fn test_assign_licenses_posts_delta_body() {
        let server = MockServer::start().await;

        let delta = LicenseDelta {
            add_licenses: vec![
                LicenseAssignment::new(String::from("sku-1")).with_disabled_plan("plan-b"),
            ],
            remove_licenses: vec![String::from("sku-2")],
        };

        Mock::given(method("POST"))
            .and(path("/users/alice@contoso.com/assignLicense"))
            .and(body_json(serde_json::json!({
                "addLicenses": [
                    {"skuId": "sku-1", "disabledPlans": ["plan-b"]}
                ],
                "removeLicenses": ["sku-2"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user-object-id"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .assign_licenses("alice@contoso.com", &delta)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_assign_licenses_surfaces_odata_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/alice@contoso.com/assignLicense"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "Request_BadRequest",
                    "message": "License sku-9 does not exist in the tenant."
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .assign_licenses(
                "alice@contoso.com",
                &LicenseDelta::remove_only(vec![String::from("sku-9")]),
            )
            .await
            .unwrap_err();

        match err {
            O365Error::Graph(GraphError::ApiRequestFailed { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("Request_BadRequest"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
