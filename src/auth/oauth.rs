//! auth::oauth
//!
//! GitHub OAuth refresh-token exchange over HTTP.
//!
//! `POST https://<host>/login/oauth/access_token` with
//! `grant_type=refresh_token`. GitHub rotates refresh tokens, so the response
//! carries a new refresh token that replaces the stored one.
//!
//! GitHub answers OAuth errors with HTTP 200 and an `error` field, so the body
//! is inspected before the status code.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::errors::RefreshError;
use super::refresh::{RefreshProvider, RefreshRequest, RefreshedTokens};

/// User-Agent header for OAuth requests.
const USER_AGENT: &str = "octocode-cli";

/// Upper bound on one exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful token response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Error response from GitHub OAuth endpoints.
#[derive(Deserialize)]
struct OAuthError {
    error: String,
    error_description: Option<String>,
}

/// Form body for the token endpoint.
#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

/// reqwest implementation of [`RefreshProvider`].
#[derive(Debug, Clone)]
pub struct GitHubOAuthClient {
    client: Client,
    /// Overrides `https://<host>` (tests point this at a mock server).
    base_url: Option<String>,
}

impl Default for GitHubOAuthClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubOAuthClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: None,
        }
    }

    /// Send every request to `base_url` instead of the target host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn token_url(&self, hostname: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/login/oauth/access_token", base),
            None => format!("https://{}/login/oauth/access_token", hostname),
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(USER_AGENT),
        );
        headers
    }
}

#[async_trait]
impl RefreshProvider for GitHubOAuthClient {
    async fn refresh(
        &self,
        hostname: &str,
        request: &RefreshRequest,
    ) -> Result<RefreshedTokens, RefreshError> {
        tracing::debug!(
            host = %hostname,
            client_type = %request.client_type,
            "posting refresh token exchange"
        );
        let body = TokenRequest {
            client_id: &request.client_id,
            refresh_token: &request.refresh_token,
            grant_type: "refresh_token",
        };

        let response = self
            .client
            .post(self.token_url(hostname))
            .headers(Self::headers())
            .form(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if let Ok(err) = serde_json::from_str::<OAuthError>(&text) {
            return Err(RefreshError::Provider(match err.error_description {
                Some(description) if !description.is_empty() => {
                    format!("{}: {}", err.error, description)
                }
                _ => err.error,
            }));
        }

        if !status.is_success() {
            return Err(RefreshError::Provider(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let tokens: TokenResponse = serde_json::from_str(&text).map_err(|_| {
            RefreshError::Provider("token endpoint returned an unexpected response".into())
        })?;

        let now = Utc::now();
        Ok(RefreshedTokens {
            access_token: tokens.access_token,
            expires_at: tokens
                .expires_in
                .map(|secs| now + chrono::Duration::seconds(secs)),
            refresh_token: tokens.refresh_token.filter(|t| !t.is_empty()),
            refresh_token_expires_at: tokens
                .refresh_token_expires_in
                .map(|secs| now + chrono::Duration::seconds(secs)),
            scopes: tokens.scope.filter(|s| !s.is_empty()).map(|s| {
                s.split(',')
                    .map(|scope| scope.trim().to_string())
                    .filter(|scope| !scope.is_empty())
                    .collect()
            }),
        })
    }
}
