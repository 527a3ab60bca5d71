//! auth::errors
//!
//! Error types for credential storage, refresh and resolution.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens. All variants carry hostnames or
//! backend diagnostics only.
//!
//! Every component returns `Result<_, CredentialsError>`. Only the
//! [`TokenResolver`](super::TokenResolver) collapses errors, into
//! `ResolvedToken::refresh_error` or a `None` result.
//!
//! # Example
//!
//! ```
//! use octocode_credentials::auth::RefreshError;
//!
//! let err = RefreshError::NotRefreshable("github.com".to_string());
//! assert!(err.to_string().contains("does not support refresh"));
//! ```

use thiserror::Error;

use crate::secrets::SecretError;

/// Errors from credential operations.
///
/// # Security
///
/// Error messages intentionally do not include token values.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// A keychain call exceeded its time budget.
    #[error("keychain operation timed out after {0} ms")]
    Timeout(u128),

    /// Stored data could not be decrypted or parsed.
    #[error("stored credentials are unreadable: {0}")]
    Decryption(String),

    /// Token refresh failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// No credentials exist for the host.
    #[error("no stored credentials for host '{0}'")]
    NotFound(String),

    /// The backend is not available on this machine.
    #[error("credential backend not available: {0}")]
    Unavailable(String),

    /// Any other storage failure.
    #[error("secret store error: {0}")]
    SecretStore(String),

    /// A credential record failed validation.
    #[error("invalid credential record: {0}")]
    InvalidRecord(String),

    /// Background task or filesystem failure.
    #[error("internal credentials error: {0}")]
    Io(String),
}

impl From<SecretError> for CredentialsError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::Timeout(ms) => CredentialsError::Timeout(ms),
            SecretError::Decryption(msg) => CredentialsError::Decryption(msg),
            SecretError::ProviderNotAvailable(msg) => CredentialsError::Unavailable(msg),
            SecretError::NotFound(key) => CredentialsError::NotFound(key),
            other => CredentialsError::SecretStore(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CredentialsError {
    fn from(err: serde_json::Error) -> Self {
        CredentialsError::Decryption(format!("invalid JSON: {}", err))
    }
}

impl From<tokio::task::JoinError> for CredentialsError {
    fn from(err: tokio::task::JoinError) -> Self {
        CredentialsError::Io(format!("storage task failed: {}", err))
    }
}

/// Errors from the refresh engine.
///
/// The first two variants are decided locally, before any network I/O.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// The stored token has no refresh token.
    #[error("token for '{0}' does not support refresh (no refresh token)")]
    NotRefreshable(String),

    /// The refresh token itself has expired.
    #[error("refresh token for '{0}' has expired; re-authentication required")]
    RefreshTokenExpired(String),

    /// The identity provider rejected or failed the exchange.
    #[error("token refresh failed: {0}")]
    Provider(String),

    /// The exchange succeeded but the renewed credential could not be saved.
    #[error("refreshed token could not be saved: {0}")]
    Persist(String),
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        RefreshError::Provider(format!("network error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_error_messages() {
        let err = RefreshError::NotRefreshable("github.com".into());
        let msg = err.to_string();
        assert!(msg.contains("does not support refresh"));
        assert!(msg.contains("no refresh token"));
        assert!(msg.contains("github.com"));

        let err = RefreshError::RefreshTokenExpired("github.com".into());
        assert!(err.to_string().contains("refresh token"));
        assert!(err.to_string().contains("expired"));

        let err = RefreshError::Provider("bad_refresh_token".into());
        assert!(err.to_string().contains("bad_refresh_token"));
    }

    #[test]
    fn secret_errors_map_to_taxonomy() {
        assert!(matches!(
            CredentialsError::from(SecretError::Timeout(3000)),
            CredentialsError::Timeout(3000)
        ));
        assert!(matches!(
            CredentialsError::from(SecretError::Decryption("tag".into())),
            CredentialsError::Decryption(_)
        ));
        assert!(matches!(
            CredentialsError::from(SecretError::ProviderNotAvailable("x".into())),
            CredentialsError::Unavailable(_)
        ));
        assert!(matches!(
            CredentialsError::from(SecretError::WriteError("disk".into())),
            CredentialsError::SecretStore(_)
        ));
    }

    #[test]
    fn refresh_error_is_transparent() {
        let err: CredentialsError = RefreshError::Provider("boom".into()).into();
        assert_eq!(err.to_string(), "token refresh failed: boom");
    }

    #[test]
    fn error_messages_never_contain_token_patterns() {
        let errors: Vec<CredentialsError> = vec![
            CredentialsError::Timeout(3000),
            CredentialsError::Decryption("tag mismatch".into()),
            RefreshError::NotRefreshable("github.com".into()).into(),
            RefreshError::RefreshTokenExpired("github.com".into()).into(),
            CredentialsError::NotFound("github.com".into()),
            CredentialsError::Unavailable("keychain".into()),
            CredentialsError::SecretStore("store error".into()),
            CredentialsError::InvalidRecord("empty hostname".into()),
            CredentialsError::Io("join".into()),
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(!msg.contains("gho_"), "error contains token pattern: {}", msg);
            assert!(!msg.contains("ghr_"), "error contains token pattern: {}", msg);
        }
    }
}
