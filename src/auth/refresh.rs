//! auth::refresh
//!
//! Refresh-token exchange for expired access tokens.
//!
//! # Flow
//!
//! 1. Reject records without a refresh token, or whose refresh token has
//!    expired. No network I/O happens in either case.
//! 2. Exchange the refresh token through a [`RefreshProvider`].
//! 3. Merge the new token fields into the record (hostname, username, git
//!    protocol and `created_at` are kept; `updated_at` is bumped).
//! 4. Persist through the [`CredentialRepository`], which invalidates the
//!    cache for the host.
//!
//! Failures are returned, never retried here.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::credentials::{format_timestamp, OAuthToken, StoredCredentials, TOKEN_TYPE_OAUTH};
use super::errors::RefreshError;
use super::expiry::is_refresh_token_expired;
use super::store::CredentialRepository;

/// Kind of OAuth client the refresh token was issued to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientType {
    #[default]
    OAuthApp,
    GitHubApp,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::OAuthApp => "oauth-app",
            ClientType::GitHubApp => "github-app",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oauth-app" => Ok(ClientType::OAuthApp),
            "github-app" => Ok(ClientType::GitHubApp),
            other => Err(format!("unknown OAuth client type '{}'", other)),
        }
    }
}

/// Input to a refresh exchange.
#[derive(Clone)]
pub struct RefreshRequest {
    pub client_type: ClientType,
    pub client_id: String,
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("client_type", &self.client_type)
            .field("client_id", &self.client_id)
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Output of a successful refresh exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// A rotated refresh token, if the provider issued one.
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
}

impl fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Identity-provider side of a refresh.
#[async_trait]
pub trait RefreshProvider: Send + Sync {
    /// Exchange `request.refresh_token` for new tokens at `hostname`.
    async fn refresh(
        &self,
        hostname: &str,
        request: &RefreshRequest,
    ) -> Result<RefreshedTokens, RefreshError>;
}

/// Build the renewed token from the old one and the exchange result.
///
/// If the provider did not rotate the refresh token, the old one and its
/// expiry are kept.
pub fn merge_refreshed(previous: &OAuthToken, refreshed: RefreshedTokens) -> OAuthToken {
    let (refresh_token, refresh_token_expires_at) = match refreshed.refresh_token {
        Some(rotated) => (
            Some(rotated),
            refreshed.refresh_token_expires_at.map(format_timestamp),
        ),
        None => (
            previous.refresh_token.clone(),
            previous.refresh_token_expires_at.clone(),
        ),
    };

    OAuthToken {
        token: refreshed.access_token,
        token_type: TOKEN_TYPE_OAUTH.to_string(),
        scopes: refreshed.scopes.or_else(|| previous.scopes.clone()),
        refresh_token,
        expires_at: refreshed.expires_at.map(format_timestamp),
        refresh_token_expires_at,
    }
}

/// Refresh `record` and persist the result.
///
/// # Errors
///
/// - [`RefreshError::NotRefreshable`] if the record has no refresh token
/// - [`RefreshError::RefreshTokenExpired`] if the refresh token has expired
/// - [`RefreshError::Provider`] if the exchange fails
/// - [`RefreshError::Persist`] if the renewed record cannot be stored
pub async fn refresh_credentials(
    record: &StoredCredentials,
    client_id: &str,
    client_type: ClientType,
    provider: &dyn RefreshProvider,
    repository: &dyn CredentialRepository,
) -> Result<StoredCredentials, RefreshError> {
    let host = record.hostname.clone();

    let refresh_token = match record.token.refresh_token.as_deref() {
        Some(token) if !token.trim().is_empty() => token.to_string(),
        _ => return Err(RefreshError::NotRefreshable(host)),
    };

    if is_refresh_token_expired(record) {
        return Err(RefreshError::RefreshTokenExpired(host));
    }

    let request = RefreshRequest {
        client_type,
        client_id: client_id.to_string(),
        refresh_token,
    };

    tracing::debug!(host = %host, client_type = %client_type, "refreshing access token");
    let refreshed = provider.refresh(&host, &request).await.map_err(|e| {
        tracing::warn!(host = %host, error = %e, "token refresh failed");
        e
    })?;

    let updated = record.with_token(merge_refreshed(&record.token, refreshed));

    repository
        .store_credentials(&updated)
        .await
        .map_err(|e| RefreshError::Persist(e.to_string()))?;

    tracing::debug!(host = %host, "access token refreshed");
    Ok(updated)
}
