//! OAuth2 client-credentials token fetcher.
//!
//! This module exchanges client credentials for a bearer token usable as an
//! `Authorization` header value against the Microsoft Graph API. It is a
//! single blocking exchange: no caching, no refresh, no retry.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{AuthError, O365Error, Result};

/// Default identity-provider endpoint.
const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Resource the token is requested for.
const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Token response from the identity provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Fetcher for OAuth2 client-credentials bearer tokens.
#[derive(Debug, Clone)]
pub struct TokenFetcher {
    /// HTTP client.
    client: Client,
    /// Identity-provider base URL.
    login_endpoint: String,
}

impl TokenFetcher {
    /// Creates a new token fetcher with a default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                O365Error::Auth(AuthError::Network {
                    message: format!("Failed to create HTTP client: {e}"),
                })
            })?;

        Ok(Self::with_client(client))
    }

    /// Creates a token fetcher using an externally configured HTTP transport.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            login_endpoint: String::from(LOGIN_ENDPOINT),
        }
    }

    /// Overrides the identity-provider endpoint.
    #[must_use]
    pub fn with_login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.login_endpoint = endpoint.into();
        self
    }

    /// Exchanges client credentials for a bearer token.
    ///
    /// Issues a single form-encoded POST to the tenant's token endpoint and
    /// expects a 200 response with an `access_token` field. The returned
    /// string is prefixed with `"Bearer "`, ready for direct use as an
    /// `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Network`] on transport failure,
    /// [`AuthError::TokenRequestFailed`] on a non-200 status, and
    /// [`AuthError::Decode`] when the body is not the expected JSON shape.
    pub async fn fetch_bearer(
        &self,
        client_id: &str,
        client_secret: &str,
        tenant_id: &str,
    ) -> Result<String> {
        let token_url = format!("{}/{}/oauth2/token", self.login_endpoint, tenant_id);
        debug!("Requesting token from {token_url}");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("resource", GRAPH_RESOURCE),
        ];

        let response = self
            .client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                O365Error::Auth(AuthError::Network {
                    message: format!("Token request failed: {e}"),
                })
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(O365Error::Auth(AuthError::TokenRequestFailed {
                status: status.as_u16(),
            }));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            O365Error::Auth(AuthError::Decode {
                message: format!("Token response was not valid JSON: {e}"),
            })
        })?;

        debug!("Token acquired");
        Ok(format!("Bearer {}", token.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> TokenFetcher {
        TokenFetcher::new()
            .unwrap()
            .with_login_endpoint(server.uri())
    }

    #[tokio::test]
    async fn test_fetch_bearer_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-a/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=id-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "abc123" })),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let bearer = fetcher
            .fetch_bearer("id-1", "secret-1", "tenant-a")
            .await
            .unwrap();

        assert_eq!(bearer, "Bearer abc123");
    }

    #[tokio::test]
    async fn test_fetch_bearer_non_200_embeds_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-a/oauth2/token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let err = fetcher
            .fetch_bearer("id-1", "secret-1", "tenant-a")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            O365Error::Auth(AuthError::TokenRequestFailed { status: 403 })
        ));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_fetch_bearer_bad_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-a/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server);
        let err = fetcher
            .fetch_bearer("id-1", "secret-1", "tenant-a")
            .await
            .unwrap_err();

        assert!(matches!(err, O365Error::Auth(AuthError::Decode { .. })));
    }
}
