//! secrets
//!
//! Storage primitives for credentials.
//!
//! # Architecture
//!
//! - [`SecretStore`]: capability set of a native secret manager
//!   (`set_secret`, `get_secret`, `delete_secret`, `list_accounts`)
//! - [`KeychainSecretStore`]: the OS keychain via `keyring` (feature-gated)
//! - [`UnavailableSecretStore`]: stands in when no keychain can be used
//! - [`KeychainAdapter`]: async, timeout-bounded access to whichever store
//!   was detected at startup
//! - [`EncryptedFile`]: one document encrypted at rest with AES-256-GCM
//!
//! # Security
//!
//! All secret store implementations follow these security rules:
//!
//! - Secrets are **never** logged or included in error messages
//! - The encrypted file and its key file use 0600 permissions on Unix
//! - All file writes are atomic (temp file + rename)

pub mod crypto;
mod encrypted_file;
mod keychain;
mod keychain_store;
mod traits;

#[cfg(test)]
pub(crate) use keychain::testing;

pub use crypto::{decrypt, encrypt, EncryptionKey};
pub use encrypted_file::EncryptedFile;
pub use keychain::{KeychainAdapter, DEFAULT_KEYCHAIN_TIMEOUT};
pub use keychain_store::{
    detect_native_store, KeychainSecretStore, NativeBackend, UnavailableSecretStore,
    ACCOUNT_INDEX,
};
pub use traits::{SecretError, SecretStore};
