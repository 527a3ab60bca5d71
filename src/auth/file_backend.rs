//! auth::file_backend
//!
//! The encrypted credentials file: `{version: 1, credentials: {host: record}}`.
//!
//! # Design
//!
//! The whole document is read, modified and re-encrypted on every write.
//! There are only ever a handful of hosts, so there is no partial update.
//!
//! A document that cannot be read, decrypted or parsed is treated as empty.
//! Corruption loses data but never fails the caller; the next write replaces
//! the damaged file.
//!
//! Writers sharing a `CredentialFileStore` (or any clone of it) are
//! serialized, so no read-modify-write loses another's record. Writers in
//! different processes still race and the last one wins.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::paths::OctocodePaths;
use crate::secrets::EncryptedFile;

use super::credentials::{CredentialDocument, StoredCredentials, DOCUMENT_VERSION};
use super::errors::CredentialsError;
use super::hostname::normalize_hostname;

/// Credential records kept in the encrypted file.
#[derive(Debug, Clone)]
pub struct CredentialFileStore {
    file: EncryptedFile,
    write_lock: Arc<Mutex<()>>,
}

impl CredentialFileStore {
    pub fn new(file: EncryptedFile) -> Self {
        Self {
            file,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The store at `~/.octocode/credentials.json`, keyed by `~/.octocode/.key`.
    pub fn from_paths(paths: &OctocodePaths) -> Self {
        Self::new(EncryptedFile::new(
            paths.credentials_file(),
            paths.key_file(),
        ))
    }

    /// Path to the encrypted document.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the whole document.
    ///
    /// Never fails: any read, decrypt or parse error yields an empty document.
    pub fn read_store(&self) -> CredentialDocument {
        let plaintext = match self.file.read() {
            Ok(Some(plaintext)) => plaintext,
            Ok(None) => return CredentialDocument::default(),
            Err(e) => {
                tracing::warn!(path = %self.path().display(), error = %e, "credentials file unreadable, treating as empty");
                return CredentialDocument::default();
            }
        };

        match serde_json::from_str::<CredentialDocument>(&plaintext) {
            Ok(doc) if doc.version == DOCUMENT_VERSION => doc,
            Ok(doc) => {
                tracing::warn!(version = doc.version, "unsupported credentials file version, treating as empty");
                CredentialDocument::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "credentials file is not a valid document, treating as empty");
                CredentialDocument::default()
            }
        }
    }

    /// Encrypt and atomically replace the whole document.
    pub fn write_store(&self, doc: &CredentialDocument) -> Result<(), CredentialsError> {
        let _guard = self.lock_writes();
        self.write_document(doc)
    }

    fn write_document(&self, doc: &CredentialDocument) -> Result<(), CredentialsError> {
        let plaintext = serde_json::to_string(doc)
            .map_err(|e| CredentialsError::InvalidRecord(e.to_string()))?;
        self.file.write(&plaintext)?;
        Ok(())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // Guards disk state only; poisoning carries nothing to repair.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up one host.
    pub fn get_credentials(&self, hostname: &str) -> Option<StoredCredentials> {
        let key = normalize_hostname(hostname);
        self.read_store().credentials.remove(&key)
    }

    /// Insert or replace the record for `record.hostname`.
    pub fn store_credentials(&self, record: &StoredCredentials) -> Result<(), CredentialsError> {
        record.validate()?;
        let _guard = self.lock_writes();
        let mut doc = self.read_store();
        doc.credentials
            .insert(normalize_hostname(&record.hostname), record.clone());
        self.write_document(&doc)
    }

    /// Remove one host. Returns whether a record was removed.
    pub fn delete_credentials(&self, hostname: &str) -> Result<bool, CredentialsError> {
        let key = normalize_hostname(hostname);
        let _guard = self.lock_writes();
        let mut doc = self.read_store();
        if doc.credentials.remove(&key).is_none() {
            return Ok(false);
        }
        self.write_document(&doc)?;
        Ok(true)
    }

    /// Hostnames with a stored record, sorted.
    pub fn list_hostnames(&self) -> Vec<String> {
        self.read_store().credentials.into_keys().collect()
    }
}
