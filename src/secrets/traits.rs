//! secrets::traits
//!
//! Secret storage trait definition.
//!
//! # Design
//!
//! The `SecretStore` trait is the capability set every native secret
//! manager exposes: set, get, delete and list, addressed by a
//! `(service, account)` pair. Octocode uses one service name for the whole
//! tool and the normalized hostname as the account.
//!
//! Implementations are synchronous. The [`KeychainAdapter`] moves calls onto
//! the blocking pool and races them against a timeout.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secrets in error messages
//! - Use secure storage mechanisms appropriate to the platform
//! - Be thread-safe (Send + Sync)
//!
//! [`KeychainAdapter`]: super::KeychainAdapter

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Note: Error messages intentionally do not include secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret not found for the given key.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Failed to write to secret storage.
    #[error("failed to write secret: {0}")]
    WriteError(String),

    /// Failed to delete from secret storage.
    #[error("failed to delete secret: {0}")]
    DeleteError(String),

    /// Permission denied accessing secret storage.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Provider not available or not configured.
    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),

    /// The native call did not finish within the allowed time.
    #[error("secret store operation timed out after {0} ms")]
    Timeout(u128),

    /// Ciphertext was malformed or failed authentication.
    #[error("decryption failed: {0}")]
    Decryption(String),
}

impl SecretError {
    /// True when the backend should be treated as absent rather than broken.
    ///
    /// Timeouts and missing providers both mean "fall through to the next
    /// backend".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SecretError::Timeout(_) | SecretError::ProviderNotAvailable(_)
        )
    }
}

/// Trait for native secret stores.
///
/// Implementations must be thread-safe (Send + Sync) and must never
/// log, print, or include secret values in error messages.
///
/// # Example
///
/// ```ignore
/// use octocode_credentials::secrets::SecretStore;
///
/// fn roundtrip(store: &dyn SecretStore) -> Result<(), SecretError> {
///     store.set_secret("octocode-cli", "github.com", "{...}")?;
///     assert!(store.get_secret("octocode-cli", "github.com")?.is_some());
///     store.delete_secret("octocode-cli", "github.com")?;
///     Ok(())
/// }
/// ```
pub trait SecretStore: Send + Sync {
    /// Short backend name for diagnostics (e.g. "macos-keychain").
    fn name(&self) -> &'static str;

    /// Whether this backend can be used at all on this machine.
    ///
    /// Called once at startup. A `false` answer makes the adapter skip every
    /// subsequent call instead of attempting it.
    fn is_available(&self) -> bool;

    /// Store a secret, overwriting any existing value.
    fn set_secret(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError>;

    /// Get a secret.
    ///
    /// Returns `Ok(None)` if the secret does not exist.
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>, SecretError>;

    /// Delete a secret.
    ///
    /// Returns `Ok(true)` if something was removed, `Ok(false)` if the
    /// secret did not exist.
    fn delete_secret(&self, service: &str, account: &str) -> Result<bool, SecretError>;

    /// List every account stored under `service`.
    fn list_accounts(&self, service: &str) -> Result<Vec<String>, SecretError>;
}
