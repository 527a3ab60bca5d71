//! auth::credentials
//!
//! Credential records shared by every backend.
//!
//! # Design
//!
//! One [`StoredCredentials`] record exists per normalized hostname. The same
//! JSON shape is stored as a keychain secret and inside the encrypted file
//! document, so a record can move between backends unchanged.
//!
//! Expiry timestamps are kept as the strings that were stored. An unparsable
//! timestamp is still loadable and is treated as expired by
//! [`auth::expiry`](super::expiry).
//!
//! # Security
//!
//! Tokens MUST never appear in logs, error messages or debug output.
//! [`OAuthToken`] implements a redacting `Debug`. JSON serialization does
//! include tokens, since it is the storage format.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::errors::CredentialsError;
use super::hostname::normalize_hostname;

/// The only token type this crate issues or stores.
pub const TOKEN_TYPE_OAUTH: &str = "oauth";

/// Current version of the encrypted file document.
pub const DOCUMENT_VERSION: u32 = 1;

/// Format a timestamp the way expiry fields are stored.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// An access token plus its optional refresh material.
///
/// A missing `expires_at` means the token never expires (personal access
/// token semantics).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    pub token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<String>,
}

fn default_token_type() -> String {
    TOKEN_TYPE_OAUTH.to_string()
}

impl OAuthToken {
    /// A token that never expires and cannot be refreshed.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: default_token_type(),
            scopes: None,
            refresh_token: None,
            expires_at: None,
            refresh_token_expires_at: None,
        }
    }

    /// Set the access token expiry.
    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(format_timestamp(at));
        self
    }

    /// Attach a refresh token and its optional expiry.
    pub fn with_refresh_token(
        mut self,
        refresh_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self.refresh_token_expires_at = expires_at.map(format_timestamp);
        self
    }

    /// Set the granted scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Whether a refresh token is present and non-blank.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsError::InvalidRecord` if the token is blank or a
    /// refresh token expiry is set without a refresh token.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.token.trim().is_empty() {
            return Err(CredentialsError::InvalidRecord(
                "access token is empty".into(),
            ));
        }
        if self.refresh_token_expires_at.is_some() && self.refresh_token.is_none() {
            return Err(CredentialsError::InvalidRecord(
                "refreshTokenExpiresAt is set without a refreshToken".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}

/// Git transport preferred for a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProtocol {
    Ssh,
    #[default]
    Https,
}

impl fmt::Display for GitProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitProtocol::Ssh => write!(f, "ssh"),
            GitProtocol::Https => write!(f, "https"),
        }
    }
}

/// The durable credential for one host.
///
/// `Debug` is derived; the token field redacts itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    /// Normalized hostname, the key in every backend.
    pub hostname: String,
    pub username: String,
    pub token: OAuthToken,
    #[serde(default)]
    pub git_protocol: GitProtocol,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCredentials {
    /// Create a fresh record. The hostname is normalized.
    pub fn new(hostname: &str, username: impl Into<String>, token: OAuthToken) -> Self {
        let now = Utc::now();
        Self {
            hostname: normalize_hostname(hostname),
            username: username.into(),
            token,
            git_protocol: GitProtocol::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the git protocol.
    pub fn with_git_protocol(mut self, protocol: GitProtocol) -> Self {
        self.git_protocol = protocol;
        self
    }

    /// Replace the token, keeping identity fields and `created_at`.
    pub fn with_token(&self, token: OAuthToken) -> Self {
        Self {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            token,
            git_protocol: self.git_protocol,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.hostname.is_empty() {
            return Err(CredentialsError::InvalidRecord("hostname is empty".into()));
        }
        self.token.validate()
    }

    /// Parse a record from its JSON storage form.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsError::Decryption` for malformed JSON and
    /// `CredentialsError::InvalidRecord` if the record breaks an invariant.
    pub fn parse(json: &str) -> Result<Self, CredentialsError> {
        let record: Self = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Serialize to the JSON storage form.
    pub fn to_json(&self) -> Result<String, CredentialsError> {
        serde_json::to_string(self)
            .map_err(|e| CredentialsError::InvalidRecord(e.to_string()))
    }
}

/// The plaintext document kept in the encrypted credentials file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDocument {
    pub version: u32,
    #[serde(default)]
    pub credentials: BTreeMap<String, StoredCredentials>,
}

impl Default for CredentialDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            credentials: BTreeMap::new(),
        }
    }
}

impl CredentialDocument {
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
