//! secrets::keychain
//!
//! Async adapter over a native [`SecretStore`].
//!
//! # Design
//!
//! Native secret managers can hang (a locked keychain waiting on a prompt,
//! a wedged D-Bus daemon). Every call made through [`KeychainAdapter`] runs
//! on the blocking pool and is raced against a fixed timeout. A call that
//! loses the race yields [`SecretError::Timeout`]; the native call is not
//! aborted, only abandoned.
//!
//! Availability is decided once, when the adapter is built. [`KeychainAdapter::detect`]
//! answers it on the blocking pool under the same timeout as every other
//! call, so building an adapter never blocks the caller. An unavailable
//! adapter answers every call with [`SecretError::ProviderNotAvailable`]
//! without touching the native store.

use std::sync::Arc;
use std::time::Duration;

use super::keychain_store::{detect_native_store, UnavailableSecretStore};
use super::traits::{SecretError, SecretStore};

/// Default bound on a single native call.
pub const DEFAULT_KEYCHAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Timed, availability-aware access to a native secret store.
#[derive(Clone)]
pub struct KeychainAdapter {
    store: Arc<dyn SecretStore>,
    service: String,
    timeout: Duration,
    available: bool,
}

impl KeychainAdapter {
    /// Wrap an existing store.
    ///
    /// Asks [`SecretStore::is_available`] on the calling thread, so this is
    /// for stores that answer without blocking. Native stores go through
    /// [`detect`](Self::detect).
    pub fn new(store: Arc<dyn SecretStore>, service: impl Into<String>, timeout: Duration) -> Self {
        let available = store.is_available();
        Self::with_availability(store, service, timeout, available)
    }

    /// An adapter that never touches a native store.
    pub fn unavailable(service: impl Into<String>) -> Self {
        Self::with_availability(
            Arc::new(UnavailableSecretStore),
            service,
            DEFAULT_KEYCHAIN_TIMEOUT,
            false,
        )
    }

    fn with_availability(
        store: Arc<dyn SecretStore>,
        service: impl Into<String>,
        timeout: Duration,
        available: bool,
    ) -> Self {
        Self {
            store,
            service: service.into(),
            timeout,
            available,
        }
    }

    /// Detect the platform store, bounding detection by `timeout`.
    ///
    /// Detection that hangs leaves the adapter unavailable for the life of
    /// the process.
    pub async fn detect(service: impl Into<String>, timeout: Duration) -> Self {
        Self::detect_with(service, timeout, detect_native_store).await
    }

    /// Run `open` on the blocking pool under `timeout`.
    ///
    /// `open` returns a store only after it has answered
    /// [`SecretStore::is_available`]; that answer is reused, never asked again.
    async fn detect_with<F>(service: impl Into<String>, timeout: Duration, open: F) -> Self
    where
        F: FnOnce() -> Option<Box<dyn SecretStore>> + Send + 'static,
    {
        let service = service.into();
        let detection = tokio::task::spawn_blocking(open);

        match tokio::time::timeout(timeout, detection).await {
            Ok(Ok(Some(store))) => Self::with_availability(Arc::from(store), service, timeout, true),
            Ok(Ok(None)) => Self::unavailable(service),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "keychain detection panicked");
                Self::unavailable(service)
            }
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "keychain detection timed out");
                Self::unavailable(service)
            }
        }
    }

    /// Whether calls will be attempted at all.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Service name every entry is stored under.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Store `secret` under `account`.
    pub async fn set_secret(&self, account: &str, secret: &str) -> Result<(), SecretError> {
        let (account, secret) = (account.to_string(), secret.to_string());
        self.run(move |store, service| store.set_secret(service, &account, &secret))
            .await
    }

    /// Fetch the secret stored under `account`.
    pub async fn get_secret(&self, account: &str) -> Result<Option<String>, SecretError> {
        let account = account.to_string();
        self.run(move |store, service| store.get_secret(service, &account))
            .await
    }

    /// Delete the secret stored under `account`.
    pub async fn delete_secret(&self, account: &str) -> Result<bool, SecretError> {
        let account = account.to_string();
        self.run(move |store, service| store.delete_secret(service, &account))
            .await
    }

    /// List every account under the adapter's service.
    pub async fn list_accounts(&self) -> Result<Vec<String>, SecretError> {
        self.run(|store, service| store.list_accounts(service)).await
    }

    /// Run `op` on the blocking pool, racing it against the timeout.
    async fn run<T, F>(&self, op: F) -> Result<T, SecretError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SecretStore, &str) -> Result<T, SecretError> + Send + 'static,
    {
        if !self.available {
            return Err(SecretError::ProviderNotAvailable(
                "keychain not available".into(),
            ));
        }

        let store = Arc::clone(&self.store);
        let service = self.service.clone();
        let task = tokio::task::spawn_blocking(move || op(store.as_ref(), &service));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(SecretError::ReadError(format!("keychain task failed: {}", e))),
            Err(_) => {
                tracing::warn!(
                    backend = self.store.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "keychain call timed out"
                );
                Err(SecretError::Timeout(self.timeout.as_millis()))
            }
        }
    }
}

impl std::fmt::Debug for KeychainAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainAdapter")
            .field("backend", &self.store.name())
            .field("service", &self.service)
            .field("timeout", &self.timeout)
            .field("available", &self.available)
            .finish()
    }
}
