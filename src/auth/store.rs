//! auth::store
//!
//! The credentials store: one object owning the keychain adapter, the
//! encrypted file and the cache.
//!
//! # Architecture
//!
//! ```text
//! get_credentials ──► cache ──miss──► fetch_credentials
//!                                        ├─► keychain (3 s bound)
//!                                        └─► encrypted file ──► background migration
//! ```
//!
//! Construct one `CredentialsStore` at startup and share it (it is cheap to
//! put behind an `Arc`). Every mutating operation invalidates the affected
//! host in the cache before it returns.
//!
//! # Backend agreement
//!
//! A successful keychain write removes the file copy of the same host, and
//! deletes hit both backends, so a host never resolves to two different
//! records. Keychain writes and deletes hold the [`MigrationFence`], so a
//! background copy started by an earlier lookup cannot undo them.
//!
//! # Example
//!
//! ```no_run
//! use octocode_credentials::auth::{
//!     CredentialRepository, CredentialsStore, OAuthToken, StoredCredentials,
//! };
//! use octocode_credentials::core::config::Config;
//! use octocode_credentials::core::paths::OctocodePaths;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = OctocodePaths::from_home().ok_or("no home directory")?;
//! let config = Config::load(&paths)?;
//! let store = CredentialsStore::from_config(&config, &paths).await;
//!
//! let record = StoredCredentials::new("github.com", "octocat", OAuthToken::new("ghp_example"));
//! store.store_credentials(&record).await?;
//! assert!(store.has_credentials("github.com").await);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::config::Config;
use crate::core::paths::OctocodePaths;
use crate::secrets::KeychainAdapter;

use super::cache::CredentialCache;
use super::credentials::{OAuthToken, StoredCredentials};
use super::errors::CredentialsError;
use super::file_backend::CredentialFileStore;
use super::hostname::normalize_hostname;
use super::migration::{migrate_if_possible, MigrationFence};

/// Durable backend that supplied a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Keychain,
    File,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Keychain => write!(f, "keychain"),
            CredentialSource::File => write!(f, "file"),
        }
    }
}

/// A record plus the backend it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedCredentials {
    pub credentials: StoredCredentials,
    pub source: CredentialSource,
}

/// What the resolver needs from durable storage.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Cached lookup with provenance.
    async fn get_credentials_with_source(
        &self,
        hostname: &str,
    ) -> Result<Option<SourcedCredentials>, CredentialsError>;

    /// Persist a record, returning the backend that took it.
    async fn store_credentials(
        &self,
        record: &StoredCredentials,
    ) -> Result<CredentialSource, CredentialsError>;
}

/// Keychain + encrypted file + cache.
#[derive(Debug)]
pub struct CredentialsStore {
    keychain: KeychainAdapter,
    file: CredentialFileStore,
    cache: CredentialCache,
    fence: Arc<MigrationFence>,
}

impl CredentialsStore {
    pub fn new(keychain: KeychainAdapter, file: CredentialFileStore, cache: CredentialCache) -> Self {
        Self {
            keychain,
            file,
            cache,
            fence: Arc::new(MigrationFence::new()),
        }
    }

    /// Build the store described by `config`.
    ///
    /// The keychain is detected only if enabled; detection is bounded by the
    /// keychain timeout.
    pub async fn from_config(config: &Config, paths: &OctocodePaths) -> Self {
        let keychain = if config.keychain_enabled() {
            KeychainAdapter::detect(config.keychain_service(), config.keychain_timeout()).await
        } else {
            KeychainAdapter::unavailable(config.keychain_service())
        };

        tracing::debug!(
            backend = keychain.backend_name(),
            available = keychain.is_available(),
            "credential store initialised"
        );

        Self::new(
            keychain,
            CredentialFileStore::from_paths(paths),
            CredentialCache::new(config.cache_ttl()),
        )
    }

    pub fn keychain(&self) -> &KeychainAdapter {
        &self.keychain
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Whether records go to the OS keychain rather than the file.
    pub fn is_using_secure_storage(&self) -> bool {
        self.keychain.is_available()
    }

    /// Path of the encrypted credentials file.
    pub fn credentials_file_path(&self) -> &Path {
        self.file.path()
    }

    /// Uncached lookup: keychain first, then the file.
    ///
    /// A keychain miss, timeout or error falls through to the file. A record
    /// found only in the file is copied into the keychain in the background.
    pub async fn fetch_credentials(
        &self,
        hostname: &str,
    ) -> Result<Option<SourcedCredentials>, CredentialsError> {
        let host = normalize_hostname(hostname);

        if self.keychain.is_available() {
            match self.keychain.get_secret(&host).await {
                Ok(Some(json)) => match StoredCredentials::parse(&json) {
                    Ok(credentials) => {
                        return Ok(Some(SourcedCredentials {
                            credentials,
                            source: CredentialSource::Keychain,
                        }))
                    }
                    Err(e) => {
                        tracing::warn!(host = %host, error = %e, "ignoring unreadable keychain entry")
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(host = %host, error = %e, "keychain lookup failed, using file")
                }
            }
        }

        let ticket = self.fence.ticket();
        let file = self.file.clone();
        let lookup_host = host.clone();
        let found = tokio::task::spawn_blocking(move || file.get_credentials(&lookup_host)).await?;

        Ok(found.map(|credentials| {
            // Detached: the lookup never waits on the copy.
            let _ = migrate_if_possible(&self.keychain, ticket, &credentials, CredentialSource::File);
            SourcedCredentials {
                credentials,
                source: CredentialSource::File,
            }
        }))
    }

    /// Cached lookup.
    pub async fn get_credentials(
        &self,
        hostname: &str,
    ) -> Result<Option<StoredCredentials>, CredentialsError> {
        Ok(self
            .get_credentials_with_source(hostname)
            .await?
            .map(|found| found.credentials))
    }

    /// Whether any backend holds a record for `hostname`.
    pub async fn has_credentials(&self, hostname: &str) -> bool {
        matches!(self.get_credentials(hostname).await, Ok(Some(_)))
    }

    /// Remove `hostname` from both backends.
    ///
    /// Returns whether anything was removed.
    pub async fn delete_credentials(&self, hostname: &str) -> Result<bool, CredentialsError> {
        let host = normalize_hostname(hostname);
        let mut removed = false;

        if self.keychain.is_available() {
            let _guard = self.fence.begin_write().await;
            match self.keychain.delete_secret(&host).await {
                Ok(deleted) => removed |= deleted,
                Err(e) => tracing::warn!(host = %host, error = %e, "keychain delete failed"),
            }
        }

        let file = self.file.clone();
        let delete_host = host.clone();
        let result = tokio::task::spawn_blocking(move || file.delete_credentials(&delete_host)).await?;

        self.cache.invalidate(Some(&host));
        removed |= result?;
        Ok(removed)
    }

    /// Replace the token of an existing record.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsError::NotFound` if no record exists for the host.
    pub async fn update_token(
        &self,
        hostname: &str,
        token: OAuthToken,
    ) -> Result<StoredCredentials, CredentialsError> {
        let host = normalize_hostname(hostname);
        let existing = self
            .fetch_credentials(&host)
            .await?
            .ok_or_else(|| CredentialsError::NotFound(host.clone()))?;

        let updated = existing.credentials.with_token(token);
        CredentialRepository::store_credentials(self, &updated).await?;
        Ok(updated)
    }

    /// Every host with a stored record, sorted and deduplicated.
    pub async fn list_stored_hosts(&self) -> Result<Vec<String>, CredentialsError> {
        let mut hosts = BTreeSet::new();

        if self.keychain.is_available() {
            match self.keychain.list_accounts().await {
                Ok(accounts) => hosts.extend(accounts),
                Err(e) => tracing::warn!(error = %e, "cannot list keychain accounts"),
            }
        }

        let file = self.file.clone();
        hosts.extend(tokio::task::spawn_blocking(move || file.list_hostnames()).await?);

        Ok(hosts.into_iter().collect())
    }

    /// Clear all in-process state between tests.
    #[cfg(test)]
    pub(crate) fn reset_for_tests(&self) {
        self.cache.reset_for_tests();
    }

    async fn write_file(&self, record: StoredCredentials) -> Result<(), CredentialsError> {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || file.store_credentials(&record)).await?
    }
}

#[async_trait]
impl CredentialRepository for CredentialsStore {
    async fn get_credentials_with_source(
        &self,
        hostname: &str,
    ) -> Result<Option<SourcedCredentials>, CredentialsError> {
        let host = normalize_hostname(hostname);

        if let Some(entry) = self.cache.get(&host) {
            return Ok(Some(SourcedCredentials {
                credentials: entry.credentials,
                source: entry.source,
            }));
        }

        let found = self.fetch_credentials(&host).await?;
        if let Some(found) = &found {
            self.cache
                .put(&host, found.credentials.clone(), found.source);
        }
        Ok(found)
    }

    /// Write to the keychain when available, otherwise to the file.
    async fn store_credentials(
        &self,
        record: &StoredCredentials,
    ) -> Result<CredentialSource, CredentialsError> {
        let mut record = record.clone();
        record.hostname = normalize_hostname(&record.hostname);
        record.validate()?;
        let host = record.hostname.clone();

        if self.keychain.is_available() {
            let json = record.to_json()?;
            let guard = self.fence.begin_write().await;
            let written = self.keychain.set_secret(&host, &json).await;
            if let Err(e) = &written {
                tracing::warn!(host = %host, error = %e, "keychain write failed, using encrypted file");
                if !e.is_unavailable() {
                    // Do not leave an older keychain copy shadowing the file.
                    let _ = self.keychain.delete_secret(&host).await;
                }
            }
            drop(guard);

            if written.is_ok() {
                let file = self.file.clone();
                let stale_host = host.clone();
                if let Err(e) =
                    tokio::task::spawn_blocking(move || file.delete_credentials(&stale_host)).await?
                {
                    tracing::warn!(host = %host, error = %e, "cannot remove file copy")
                }
                self.cache.invalidate(Some(&host));
                return Ok(CredentialSource::Keychain);
            }
        }

        let result = self.write_file(record).await;
        self.cache.invalidate(Some(&host));
        result.map(|()| CredentialSource::File)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::testing::MemorySecretStore;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const SERVICE: &str = "octocode-test";

    fn file_store(temp: &TempDir) -> CredentialFileStore {
        CredentialFileStore::from_paths(&OctocodePaths::new(temp.path().join(".octocode")))
    }

    fn file_only() -> (TempDir, CredentialsStore) {
        let temp = TempDir::new().unwrap();
        let store = CredentialsStore::new(
            KeychainAdapter::unavailable(SERVICE),
            file_store(&temp),
            CredentialCache::default(),
        );
        (temp, store)
    }

    fn with_keychain(memory: Arc<MemorySecretStore>) -> (TempDir, CredentialsStore) {
        let temp = TempDir::new().unwrap();
        let store = CredentialsStore::new(
            KeychainAdapter::new(memory, SERVICE, Duration::from_millis(200)),
            file_store(&temp),
            CredentialCache::default(),
        );
        (temp, store)
    }

    fn record(host: &str, token: &str) -> StoredCredentials {
        StoredCredentials::new(host, "octocat", OAuthToken::new(token))
    }

    #[tokio::test]
    async fn file_only_roundtrip() {
        let (_temp, store) = file_only();
        let rec = record("github.com", "gho_one");

        let source = store.store_credentials(&rec).await.unwrap();
        assert_eq!(source, CredentialSource::File);
        assert!(!store.is_using_secure_storage());

        let found = store.get_credentials_with_source("github.com").await.unwrap().unwrap();
        assert_eq!(found.credentials, rec);
        assert_eq!(found.source, CredentialSource::File);
    }

    #[tokio::test]
    async fn restore_invalidates_cache() {
        let (_temp, store) = file_only();
        store.store_credentials(&record("github.com", "gho_one")).await.unwrap();
        assert_eq!(
            store.get_credentials("github.com").await.unwrap().unwrap().token.token,
            "gho_one"
        );

        store.store_credentials(&record("github.com", "gho_two")).await.unwrap();
        assert_eq!(
            store.get_credentials("github.com").await.unwrap().unwrap().token.token,
            "gho_two"
        );
    }

    #[tokio::test]
    async fn cache_serves_repeat_lookups() {
        let memory = Arc::new(MemorySecretStore::new());
        let (_temp, store) = with_keychain(Arc::clone(&memory));
        store.store_credentials(&record("github.com", "gho_a")).await.unwrap();

        store.get_credentials("github.com").await.unwrap();
        let calls = memory.call_count();
        store.get_credentials("github.com").await.unwrap();
        store.get_credentials("GITHUB.com").await.unwrap();

        assert_eq!(memory.call_count(), calls);
    }

    #[tokio::test]
    async fn keychain_store_removes_file_copy() {
        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        let file = file_store(&temp);
        file.store_credentials(&record("github.com", "gho_old")).unwrap();

        let source = store.store_credentials(&record("github.com", "gho_new")).await.unwrap();

        assert_eq!(source, CredentialSource::Keychain);
        assert!(file.get_credentials("github.com").is_none());
        let found = store.get_credentials_with_source("github.com").await.unwrap().unwrap();
        assert_eq!(found.source, CredentialSource::Keychain);
        assert_eq!(found.credentials.token.token, "gho_new");
    }

    #[tokio::test]
    async fn broken_keychain_falls_back_to_file() {
        let memory = Arc::new(MemorySecretStore::broken());
        let (_temp, store) = with_keychain(memory);

        let source = store.store_credentials(&record("github.com", "gho_a")).await.unwrap();
        assert_eq!(source, CredentialSource::File);

        let found = store.get_credentials_with_source("github.com").await.unwrap().unwrap();
        assert_eq!(found.source, CredentialSource::File);
    }

    #[tokio::test]
    async fn slow_keychain_times_out_to_file() {
        let memory = Arc::new(MemorySecretStore::slow(Duration::from_millis(800)));
        let (temp, store) = with_keychain(memory);
        file_store(&temp)
            .store_credentials(&record("github.com", "gho_file"))
            .unwrap();

        let found = store.fetch_credentials("github.com").await.unwrap().unwrap();
        assert_eq!(found.source, CredentialSource::File);
        assert_eq!(found.credentials.token.token, "gho_file");
    }

    #[tokio::test]
    async fn file_hit_migrates_into_keychain() {
        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        let rec = record("github.com", "gho_file");
        file_store(&temp).store_credentials(&rec).unwrap();

        let found = store.fetch_credentials("github.com").await.unwrap().unwrap();
        assert_eq!(found.source, CredentialSource::File);

        let mut migrated = None;
        for _ in 0..50 {
            if let Ok(Some(json)) = store.keychain().get_secret("github.com").await {
                migrated = Some(json);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(StoredCredentials::parse(&migrated.unwrap()).unwrap(), rec);

        // Copy only: the file still holds the record.
        assert!(file_store(&temp).get_credentials("github.com").is_some());
    }

    #[tokio::test]
    async fn refresh_after_file_lookup_survives_migration() {
        use crate::auth::refresh::testing::ScriptedProvider;
        use crate::auth::refresh::{refresh_credentials, ClientType, RefreshedTokens};
        use chrono::Utc;

        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        let expired = StoredCredentials::new(
            "github.com",
            "octocat",
            OAuthToken::new("gho_expired")
                .expiring_at(Utc::now() - chrono::Duration::hours(1))
                .with_refresh_token("ghr_old", Some(Utc::now() + chrono::Duration::days(30))),
        );
        file_store(&temp).store_credentials(&expired).unwrap();

        // Starts a background copy of the expired record.
        let found = store.get_credentials_with_source("github.com").await.unwrap().unwrap();
        assert_eq!(found.source, CredentialSource::File);

        let provider = ScriptedProvider::ok(RefreshedTokens {
            access_token: "gho_refreshed".into(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(8)),
            refresh_token: Some("ghr_rotated".into()),
            refresh_token_expires_at: None,
            scopes: None,
        });
        refresh_credentials(
            &found.credentials,
            "Iv1.test",
            ClientType::OAuthApp,
            &provider,
            &store,
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        store.cache().invalidate(None);

        let current = store.fetch_credentials("github.com").await.unwrap().unwrap();
        assert_eq!(current.source, CredentialSource::Keychain);
        assert_eq!(current.credentials.token.token, "gho_refreshed");
        assert_eq!(current.credentials.token.refresh_token.as_deref(), Some("ghr_rotated"));
    }

    #[tokio::test]
    async fn logout_after_file_lookup_stays_logged_out() {
        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        file_store(&temp)
            .store_credentials(&record("github.com", "gho_file"))
            .unwrap();

        store.get_credentials("github.com").await.unwrap().unwrap();
        assert!(store.delete_credentials("github.com").await.unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(memory.data.lock().unwrap().is_empty());
        assert!(store.fetch_credentials("github.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_keychain_entry_falls_back() {
        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        store.keychain().set_secret("github.com", "{broken").await.unwrap();
        file_store(&temp)
            .store_credentials(&record("github.com", "gho_file"))
            .unwrap();

        let found = store.fetch_credentials("github.com").await.unwrap().unwrap();
        assert_eq!(found.source, CredentialSource::File);
    }

    #[tokio::test]
    async fn delete_hits_both_backends() {
        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        store.store_credentials(&record("github.com", "gho_kc")).await.unwrap();
        file_store(&temp)
            .store_credentials(&record("github.com", "gho_file"))
            .unwrap();
        store.get_credentials("github.com").await.unwrap();

        assert!(store.delete_credentials("HTTPS://github.com/").await.unwrap());

        assert!(store.get_credentials("github.com").await.unwrap().is_none());
        assert!(file_store(&temp).get_credentials("github.com").is_none());
        assert!(!store.delete_credentials("github.com").await.unwrap());
    }

    #[tokio::test]
    async fn update_token_keeps_identity() {
        let (_temp, store) = file_only();
        let rec = record("github.com", "gho_old");
        store.store_credentials(&rec).await.unwrap();
        store.get_credentials("github.com").await.unwrap();

        let updated = store
            .update_token("github.com", OAuthToken::new("gho_new"))
            .await
            .unwrap();

        assert_eq!(updated.created_at, rec.created_at);
        assert_eq!(updated.username, "octocat");
        assert_eq!(
            store.get_credentials("github.com").await.unwrap().unwrap().token.token,
            "gho_new"
        );
    }

    #[tokio::test]
    async fn update_token_missing_host() {
        let (_temp, store) = file_only();
        let err = store
            .update_token("github.com", OAuthToken::new("gho_new"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialsError::NotFound(host) if host == "github.com"));
    }

    #[tokio::test]
    async fn list_stored_hosts_merges_backends() {
        let memory = Arc::new(MemorySecretStore::new());
        let (temp, store) = with_keychain(Arc::clone(&memory));
        store.store_credentials(&record("github.com", "gho_a")).await.unwrap();
        store.store_credentials(&record("ghe.corp", "gho_b")).await.unwrap();
        let file = file_store(&temp);
        file.store_credentials(&record("alpha.example", "gho_c")).unwrap();
        file.store_credentials(&record("github.com", "gho_d")).unwrap();

        assert_eq!(
            store.list_stored_hosts().await.unwrap(),
            vec!["alpha.example", "ghe.corp", "github.com"]
        );
    }

    #[tokio::test]
    async fn has_credentials() {
        let (_temp, store) = file_only();
        assert!(!store.has_credentials("github.com").await);
        store.store_credentials(&record("github.com", "gho_a")).await.unwrap();
        assert!(store.has_credentials("GitHub.com").await);
    }

    #[tokio::test]
    async fn invalid_record_rejected() {
        let (_temp, store) = file_only();
        let err = store.store_credentials(&record("", "gho_a")).await.unwrap_err();
        assert!(matches!(err, CredentialsError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn reset_clears_cache() {
        let (_temp, store) = file_only();
        store.store_credentials(&record("github.com", "gho_a")).await.unwrap();
        store.get_credentials("github.com").await.unwrap();
        assert_eq!(store.cache().len(), 1);

        store.reset_for_tests();

        assert!(store.cache().is_empty());
    }

    #[tokio::test]
    async fn credentials_file_path() {
        let (temp, store) = file_only();
        assert_eq!(
            store.credentials_file_path(),
            temp.path().join(".octocode").join("credentials.json")
        );
    }
}
