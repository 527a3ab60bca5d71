//! auth::cache
//!
//! In-process credential cache with TTL support.
//!
//! # Design
//!
//! The cache is keyed by normalized hostname. Each entry stores the record,
//! the backend that supplied it, and the instant it was cached.
//!
//! Cache invalidation:
//! - Entries expire after the TTL (5 minutes by default)
//! - Every store, delete, update or refresh invalidates the host
//! - `get()` never refills; the caller repopulates with `put()`
//!
//! The map sits behind a `Mutex` so one cache can be shared by concurrent
//! resolution tasks.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use octocode_credentials::auth::{CredentialCache, CredentialSource, OAuthToken, StoredCredentials};
//!
//! let cache = CredentialCache::new(Duration::from_secs(300));
//! let record = StoredCredentials::new("github.com", "octocat", OAuthToken::new("ghp_x"));
//!
//! cache.put("github.com", record, CredentialSource::File);
//! assert!(cache.get("github.com").is_some());
//!
//! cache.invalidate(Some("github.com"));
//! assert!(cache.get("github.com").is_none());
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::credentials::StoredCredentials;
use super::hostname::normalize_hostname;
use super::store::CredentialSource;

/// Default cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A cached credential.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub credentials: StoredCredentials,
    pub source: CredentialSource,
    pub cached_at: Instant,
}

impl CacheEntry {
    /// Check if this entry is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() >= ttl
    }
}

/// Hostname → credential cache.
#[derive(Debug)]
pub struct CredentialCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl CredentialCache {
    /// Create an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached record if present and younger than the TTL.
    ///
    /// Expired entries are dropped on lookup.
    pub fn get(&self, hostname: &str) -> Option<CacheEntry> {
        let key = normalize_hostname(hostname);
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(entry) if !entry.is_expired(self.ttl) => Some(entry.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a record for `hostname`.
    pub fn put(&self, hostname: &str, credentials: StoredCredentials, source: CredentialSource) {
        self.lock().insert(
            normalize_hostname(hostname),
            CacheEntry {
                credentials,
                source,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop one host, or everything when `hostname` is `None`.
    pub fn invalidate(&self, hostname: Option<&str>) {
        let mut entries = self.lock();
        match hostname {
            Some(host) => {
                entries.remove(&normalize_hostname(host));
            }
            None => entries.clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all state between tests.
    #[cfg(test)]
    pub(crate) fn reset_for_tests(&self) {
        self.invalidate(None);
    }

    #[cfg(test)]
    fn insert_aged(&self, hostname: &str, credentials: StoredCredentials, age: Duration) {
        let cached_at = Instant::now()
            .checked_sub(age)
            .unwrap_or_else(Instant::now);
        self.lock().insert(
            normalize_hostname(hostname),
            CacheEntry {
                credentials,
                source: CredentialSource::File,
                cached_at,
            },
        );
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
