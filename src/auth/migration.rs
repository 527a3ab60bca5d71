//! auth::migration
//!
//! Background copy of file-backed credentials into the keychain.
//!
//! When a lookup falls back to the encrypted file while a keychain is
//! available, the record is copied into the keychain on a spawned task. The
//! caller never awaits it and a failure is only logged. The file copy is left
//! in place; the next explicit store removes it.
//!
//! # Ordering
//!
//! A copy must never replace a record written after the lookup that started
//! it. Every foreground keychain write or delete goes through
//! [`MigrationFence::begin_write`], which bumps a generation counter under a
//! lock. The lookup takes a [`MigrationTicket`] before reading the file; the
//! copy runs under the same lock and is dropped if the generation moved or
//! the keychain already holds an entry for the host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::secrets::KeychainAdapter;

use super::credentials::StoredCredentials;
use super::store::CredentialSource;

/// Orders background copies against foreground keychain writes.
#[derive(Debug, Default)]
pub struct MigrationFence {
    generation: AtomicU64,
    lock: Mutex<()>,
}

impl MigrationFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the returned guard for the whole keychain write or delete.
    pub async fn begin_write(&self) -> MutexGuard<'_, ()> {
        let guard = self.lock.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        guard
    }

    /// Snapshot taken before a file read.
    pub fn ticket(self: &Arc<Self>) -> MigrationTicket {
        MigrationTicket {
            fence: Arc::clone(self),
            generation: self.generation.load(Ordering::SeqCst),
        }
    }
}

/// Permission to copy what a lookup read, valid until the next write.
#[derive(Debug)]
pub struct MigrationTicket {
    fence: Arc<MigrationFence>,
    generation: u64,
}

impl MigrationTicket {
    fn is_current(&self) -> bool {
        self.fence.generation.load(Ordering::SeqCst) == self.generation
    }
}

/// Start a migration of `record` into the keychain if it came from the file.
///
/// Returns the spawned task, or `None` when nothing needs to move. Dropping
/// the handle detaches the task. Must be called from within a tokio runtime.
pub fn migrate_if_possible(
    keychain: &KeychainAdapter,
    ticket: MigrationTicket,
    record: &StoredCredentials,
    source: CredentialSource,
) -> Option<JoinHandle<()>> {
    if source != CredentialSource::File || !keychain.is_available() {
        return None;
    }

    let json = match record.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::debug!(host = %record.hostname, error = %e, "skipping migration");
            return None;
        }
    };

    let keychain = keychain.clone();
    let host = record.hostname.clone();
    Some(tokio::spawn(async move {
        let _guard = ticket.fence.lock.lock().await;

        if !ticket.is_current() {
            tracing::debug!(host = %host, "keychain written since lookup, skipping migration");
            return;
        }

        match keychain.get_secret(&host).await {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::debug!(host = %host, "keychain already holds credentials, skipping migration");
                return;
            }
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "credential migration failed");
                return;
            }
        }

        match keychain.set_secret(&host, &json).await {
            Ok(()) => tracing::debug!(host = %host, "migrated credentials into keychain"),
            Err(e) => tracing::debug!(host = %host, error = %e, "credential migration failed"),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::OAuthToken;
    use crate::secrets::testing::MemorySecretStore;
    use std::time::Duration;

    fn record() -> StoredCredentials {
        StoredCredentials::new("github.com", "octocat", OAuthToken::new("gho_migrate"))
    }

    fn adapter(store: Arc<MemorySecretStore>) -> KeychainAdapter {
        KeychainAdapter::new(store, "octocode-test", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn file_record_is_copied() {
        let store = Arc::new(MemorySecretStore::new());
        let keychain = adapter(Arc::clone(&store));
        let fence = Arc::new(MigrationFence::new());

        let handle =
            migrate_if_possible(&keychain, fence.ticket(), &record(), CredentialSource::File)
                .unwrap();
        handle.await.unwrap();

        let json = keychain.get_secret("github.com").await.unwrap().unwrap();
        assert_eq!(StoredCredentials::parse(&json).unwrap(), record());
    }

    #[tokio::test]
    async fn keychain_record_is_not_copied() {
        let store = Arc::new(MemorySecretStore::new());
        let keychain = adapter(Arc::clone(&store));
        let fence = Arc::new(MigrationFence::new());

        assert!(migrate_if_possible(
            &keychain,
            fence.ticket(),
            &record(),
            CredentialSource::Keychain
        )
        .is_none());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn unavailable_keychain_skips() {
        let keychain = KeychainAdapter::unavailable("octocode-test");
        let fence = Arc::new(MigrationFence::new());

        assert!(
            migrate_if_possible(&keychain, fence.ticket(), &record(), CredentialSource::File)
                .is_none()
        );
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let store = Arc::new(MemorySecretStore::broken());
        let keychain = adapter(Arc::clone(&store));
        let fence = Arc::new(MigrationFence::new());

        let handle =
            migrate_if_possible(&keychain, fence.ticket(), &record(), CredentialSource::File)
                .unwrap();
        assert!(handle.await.is_ok());
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn write_after_lookup_cancels_copy() {
        let store = Arc::new(MemorySecretStore::new());
        let keychain = adapter(Arc::clone(&store));
        let fence = Arc::new(MigrationFence::new());
        let ticket = fence.ticket();

        {
            let _guard = fence.begin_write().await;
            let newer = StoredCredentials::new("github.com", "octocat", OAuthToken::new("gho_newer"));
            keychain
                .set_secret("github.com", &newer.to_json().unwrap())
                .await
                .unwrap();
        }

        migrate_if_possible(&keychain, ticket, &record(), CredentialSource::File)
            .unwrap()
            .await
            .unwrap();

        let json = keychain.get_secret("github.com").await.unwrap().unwrap();
        assert_eq!(StoredCredentials::parse(&json).unwrap().token.token, "gho_newer");
    }

    #[tokio::test]
    async fn delete_after_lookup_is_not_undone() {
        let store = Arc::new(MemorySecretStore::new());
        let keychain = adapter(Arc::clone(&store));
        let fence = Arc::new(MigrationFence::new());
        let ticket = fence.ticket();

        {
            let _guard = fence.begin_write().await;
            keychain.delete_secret("github.com").await.unwrap();
        }

        migrate_if_possible(&keychain, ticket, &record(), CredentialSource::File)
            .unwrap()
            .await
            .unwrap();

        assert!(keychain.get_secret("github.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn existing_keychain_entry_is_kept() {
        let store = Arc::new(MemorySecretStore::new());
        let keychain = adapter(Arc::clone(&store));
        let fence = Arc::new(MigrationFence::new());
        let other = StoredCredentials::new("github.com", "octocat", OAuthToken::new("gho_other"));
        keychain
            .set_secret("github.com", &other.to_json().unwrap())
            .await
            .unwrap();

        migrate_if_possible(&keychain, fence.ticket(), &record(), CredentialSource::File)
            .unwrap()
            .await
            .unwrap();

        let json = keychain.get_secret("github.com").await.unwrap().unwrap();
        assert_eq!(StoredCredentials::parse(&json).unwrap(), other);
    }
}
