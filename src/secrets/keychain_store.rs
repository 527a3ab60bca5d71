//! secrets::keychain_store
//!
//! Native secret store backends.
//!
//! # Platform Support
//!
//! With the `keychain` feature, [`KeychainSecretStore`] talks to the
//! platform's secret manager through the `keyring` crate:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)
//!
//! When no backend can be used (feature disabled, headless machine, no
//! D-Bus session) the [`UnavailableSecretStore`] stands in, so callers never
//! check for a missing store themselves.
//!
//! # Account index
//!
//! Native stores cannot enumerate entries portably, so the account names
//! for a service are kept in one extra entry under [`ACCOUNT_INDEX`].

#[cfg(feature = "keychain")]
use keyring::Entry;

use super::traits::{SecretError, SecretStore};

/// Account name of the entry that indexes every other account of a service.
pub const ACCOUNT_INDEX: &str = "__octocode_accounts__";

/// Which native secret manager this build talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeBackend {
    /// macOS Keychain Services
    MacOsKeychain,
    /// Windows Credential Manager
    WindowsCredentialManager,
    /// freedesktop Secret Service (GNOME Keyring, KWallet)
    LinuxSecretService,
}

impl NativeBackend {
    /// The backend for the platform this binary was compiled for.
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::MacOsKeychain)
        } else if cfg!(target_os = "windows") {
            Some(Self::WindowsCredentialManager)
        } else if cfg!(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd")) {
            Some(Self::LinuxSecretService)
        } else {
            None
        }
    }

    /// Backend name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MacOsKeychain => "macos-keychain",
            Self::WindowsCredentialManager => "windows-credential-manager",
            Self::LinuxSecretService => "linux-secret-service",
        }
    }
}

/// Parse the account index, tolerating a corrupted entry.
#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
fn parse_index(raw: Option<String>) -> Vec<String> {
    raw.and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

/// Store that reports itself unavailable and refuses every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSecretStore;

impl SecretStore for UnavailableSecretStore {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn set_secret(&self, _service: &str, _account: &str, _secret: &str) -> Result<(), SecretError> {
        Err(SecretError::ProviderNotAvailable("keychain not available".into()))
    }

    fn get_secret(&self, _service: &str, _account: &str) -> Result<Option<String>, SecretError> {
        Err(SecretError::ProviderNotAvailable("keychain not available".into()))
    }

    fn delete_secret(&self, _service: &str, _account: &str) -> Result<bool, SecretError> {
        Err(SecretError::ProviderNotAvailable("keychain not available".into()))
    }

    fn list_accounts(&self, _service: &str) -> Result<Vec<String>, SecretError> {
        Err(SecretError::ProviderNotAvailable("keychain not available".into()))
    }
}

/// OS keychain secret store.
///
/// Uses the OS keychain (macOS Keychain, Windows Credential Manager,
/// Linux Secret Service) via the `keyring` crate.
///
/// This is only functional when compiled with the `keychain` feature.
#[cfg(feature = "keychain")]
#[derive(Debug)]
pub struct KeychainSecretStore {
    backend: NativeBackend,
}

#[cfg(feature = "keychain")]
impl KeychainSecretStore {
    /// Create a store for the current platform.
    pub fn new() -> Result<Self, SecretError> {
        let backend = NativeBackend::current().ok_or_else(|| {
            SecretError::ProviderNotAvailable("no native keychain on this platform".into())
        })?;
        Ok(Self { backend })
    }

    /// Create a keyring entry for the given account.
    fn entry(&self, service: &str, account: &str) -> Result<Entry, SecretError> {
        Entry::new(service, account)
            .map_err(|e| SecretError::ReadError(format!("cannot create keyring entry: {}", e)))
    }

    fn read(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        match self.entry(service, account)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(SecretError::ReadError(
                "ambiguous keychain entry".to_string(),
            )),
            Err(keyring::Error::NoStorageAccess(e)) => {
                Err(SecretError::PermissionDenied(format!("keychain locked: {}", e)))
            }
            Err(keyring::Error::PlatformFailure(e)) => Err(SecretError::ProviderNotAvailable(
                format!("keychain platform failure: {}", e),
            )),
            Err(e) => Err(SecretError::ReadError(format!(
                "cannot read from keychain: {}",
                e
            ))),
        }
    }

    fn write_index(&self, service: &str, accounts: &[String]) -> Result<(), SecretError> {
        let json = serde_json::to_string(accounts)
            .map_err(|e| SecretError::WriteError(format!("cannot encode account index: {}", e)))?;
        self.entry(service, ACCOUNT_INDEX)?
            .set_password(&json)
            .map_err(|e| SecretError::WriteError(format!("cannot write account index: {}", e)))
    }
}

#[cfg(feature = "keychain")]
impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &'static str {
        self.backend.name()
    }

    fn is_available(&self) -> bool {
        // A lookup of a missing entry succeeds with NoEntry on a working
        // keychain and fails on a headless box.
        match self.read("octocode-availability", "check") {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(backend = self.name(), error = %e, "keychain availability check failed");
                false
            }
        }
    }

    fn set_secret(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError> {
        self.entry(service, account)?
            .set_password(secret)
            .map_err(|e| SecretError::WriteError(format!("cannot write to keychain: {}", e)))?;

        let mut accounts = parse_index(self.read(service, ACCOUNT_INDEX)?);
        if !accounts.iter().any(|a| a == account) {
            accounts.push(account.to_string());
            self.write_index(service, &accounts)?;
        }
        Ok(())
    }

    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        self.read(service, account)
    }

    fn delete_secret(&self, service: &str, account: &str) -> Result<bool, SecretError> {
        let removed = match self.entry(service, account)?.delete_credential() {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false, // Already gone, that's fine
            Err(e) => {
                return Err(SecretError::DeleteError(format!(
                    "cannot delete from keychain: {}",
                    e
                )))
            }
        };

        let mut accounts = parse_index(self.read(service, ACCOUNT_INDEX)?);
        let before = accounts.len();
        accounts.retain(|a| a != account);
        if accounts.len() != before {
            self.write_index(service, &accounts)?;
        }
        Ok(removed)
    }

    fn list_accounts(&self, service: &str) -> Result<Vec<String>, SecretError> {
        Ok(parse_index(self.read(service, ACCOUNT_INDEX)?))
    }
}

// Stub implementation when keychain feature is disabled
#[cfg(not(feature = "keychain"))]
#[derive(Debug)]
pub struct KeychainSecretStore {
    _private: (),
}

#[cfg(not(feature = "keychain"))]
impl KeychainSecretStore {
    /// Create a new keychain secret store.
    ///
    /// Always fails when compiled without the `keychain` feature.
    pub fn new() -> Result<Self, SecretError> {
        Err(SecretError::ProviderNotAvailable(
            "keychain support not enabled (compile with --features keychain)".into(),
        ))
    }
}

/// Pick the secret store for this machine.
///
/// Returns the native keychain store when it is compiled in and has just
/// answered [`SecretStore::is_available`]; `None` otherwise. Blocks for as
/// long as the native call does.
pub fn detect_native_store() -> Option<Box<dyn SecretStore>> {
    match KeychainSecretStore::new() {
        #[cfg(feature = "keychain")]
        Ok(store) if store.is_available() => {
            tracing::debug!(backend = store.name(), "using native keychain");
            Some(Box::new(store))
        }
        #[cfg(feature = "keychain")]
        Ok(store) => {
            tracing::debug!(backend = store.name(), "native keychain did not answer, using file storage");
            None
        }
        #[cfg(not(feature = "keychain"))]
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "no native keychain, using file storage");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_store_refuses_everything() {
        let store = UnavailableSecretStore;

        assert!(!store.is_available());
        assert_eq!(store.name(), "unavailable");
        assert!(store.set_secret("svc", "acct", "x").unwrap_err().is_unavailable());
        assert!(store.get_secret("svc", "acct").unwrap_err().is_unavailable());
        assert!(store.delete_secret("svc", "acct").unwrap_err().is_unavailable());
        assert!(store.list_accounts("svc").unwrap_err().is_unavailable());
    }

    #[test]
    fn native_backend_names() {
        assert_eq!(NativeBackend::MacOsKeychain.name(), "macos-keychain");
        assert_eq!(
            NativeBackend::WindowsCredentialManager.name(),
            "windows-credential-manager"
        );
        assert_eq!(NativeBackend::LinuxSecretService.name(), "linux-secret-service");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_uses_secret_service() {
        assert_eq!(NativeBackend::current(), Some(NativeBackend::LinuxSecretService));
    }

    #[test]
    fn parse_index_tolerates_garbage() {
        assert!(parse_index(None).is_empty());
        assert!(parse_index(Some("not json".into())).is_empty());
        assert_eq!(
            parse_index(Some(r#"["github.com","ghe.corp"]"#.into())),
            vec!["github.com".to_string(), "ghe.corp".to_string()]
        );
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn new_fails_without_feature() {
        let err = KeychainSecretStore::new().unwrap_err().to_string();
        assert!(err.contains("keychain"));
        assert!(err.contains("not enabled"));
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn detect_finds_nothing_without_feature() {
        assert!(detect_native_store().is_none());
    }
}
