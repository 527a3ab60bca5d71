//! auth::resolver
//!
//! Token resolution: environment → stored credentials (with refresh) → gh CLI.
//!
//! # Order
//!
//! 1. `OCTOCODE_TOKEN`, `GH_TOKEN`, `GITHUB_TOKEN` (first non-blank, trimmed).
//!    Storage is never touched when one is set.
//! 2. The credentials store (cache, keychain, encrypted file). A valid token
//!    is returned with the backend that answered.
//! 3. An expired token is refreshed. A refresh failure is recorded and
//!    resolution continues.
//! 4. The CLI fallback, if configured. Any refresh error is carried along.
//! 5. Nothing: `None`, or a token-less result that explains the refresh
//!    failure.
//!
//! The resolver never returns an error and never hands out an expired token.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use octocode_credentials::auth::{
//!     CredentialsStore, GhCliTokenSource, GitHubOAuthClient, TokenResolver,
//! };
//! use octocode_credentials::core::config::Config;
//! use octocode_credentials::core::paths::OctocodePaths;
//!
//! # async fn example() -> Option<()> {
//! let paths = OctocodePaths::from_home()?;
//! let config = Config::load(&paths).ok()?;
//! let store = Arc::new(CredentialsStore::from_config(&config, &paths).await);
//!
//! let resolver = TokenResolver::new(store, Arc::new(GitHubOAuthClient::new()))
//!     .with_cli_fallback(Arc::new(GhCliTokenSource::new()));
//!
//! let resolved = resolver.resolve_token_full(Some("github.com"), None).await?;
//! println!("token from {}", resolved.source);
//! # Some(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::config::DEFAULT_CLIENT_ID;

use super::expiry::is_token_expired;
use super::gh_cli::CliTokenSource;
use super::hostname::{normalize_hostname, DEFAULT_HOSTNAME};
use super::refresh::{refresh_credentials, ClientType, RefreshProvider};
use super::store::{CredentialRepository, CredentialSource, SourcedCredentials};

/// Environment variables checked, in priority order.
pub const ENV_TOKEN_VARS: [&str; 3] = ["OCTOCODE_TOKEN", "GH_TOKEN", "GITHUB_TOKEN"];

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenSource {
    #[serde(rename = "env:OCTOCODE_TOKEN")]
    EnvOctocodeToken,
    #[serde(rename = "env:GH_TOKEN")]
    EnvGhToken,
    #[serde(rename = "env:GITHUB_TOKEN")]
    EnvGithubToken,
    #[serde(rename = "keychain")]
    Keychain,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "gh-cli")]
    GhCli,
    #[serde(rename = "none")]
    None,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::EnvOctocodeToken => "env:OCTOCODE_TOKEN",
            TokenSource::EnvGhToken => "env:GH_TOKEN",
            TokenSource::EnvGithubToken => "env:GITHUB_TOKEN",
            TokenSource::Keychain => "keychain",
            TokenSource::File => "file",
            TokenSource::GhCli => "gh-cli",
            TokenSource::None => "none",
        }
    }

    fn from_env_var(name: &str) -> Self {
        match name {
            "OCTOCODE_TOKEN" => TokenSource::EnvOctocodeToken,
            "GH_TOKEN" => TokenSource::EnvGhToken,
            _ => TokenSource::EnvGithubToken,
        }
    }

    pub fn is_env(&self) -> bool {
        matches!(
            self,
            TokenSource::EnvOctocodeToken | TokenSource::EnvGhToken | TokenSource::EnvGithubToken
        )
    }
}

impl From<CredentialSource> for TokenSource {
    fn from(source: CredentialSource) -> Self {
        match source {
            CredentialSource::Keychain => TokenSource::Keychain,
            CredentialSource::File => TokenSource::File,
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a resolution.
///
/// `token` is `None` only when resolution failed after a refresh error; the
/// reason is in `refresh_error`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedToken {
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub source: TokenSource,
    pub was_refreshed: bool,
    pub username: Option<String>,
    pub refresh_error: Option<String>,
}

impl ResolvedToken {
    fn found(token: String, source: TokenSource) -> Self {
        Self {
            token: Some(token),
            source,
            was_refreshed: false,
            username: None,
            refresh_error: None,
        }
    }

    fn unresolved(refresh_error: String) -> Self {
        Self {
            token: None,
            source: TokenSource::None,
            was_refreshed: false,
            username: None,
            refresh_error: Some(refresh_error),
        }
    }
}

impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("source", &self.source)
            .field("was_refreshed", &self.was_refreshed)
            .field("username", &self.username)
            .field("refresh_error", &self.refresh_error)
            .finish()
    }
}

/// Environment lookup, injectable for tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Orchestrates every token source.
#[derive(Clone)]
pub struct TokenResolver {
    repository: Arc<dyn CredentialRepository>,
    refresher: Arc<dyn RefreshProvider>,
    cli: Option<Arc<dyn CliTokenSource>>,
    env: EnvLookup,
    client_id: String,
    client_type: ClientType,
}

impl TokenResolver {
    /// A resolver reading the process environment, without CLI fallback.
    pub fn new(
        repository: Arc<dyn CredentialRepository>,
        refresher: Arc<dyn RefreshProvider>,
    ) -> Self {
        Self {
            repository,
            refresher,
            cli: None,
            env: Arc::new(|name: &str| std::env::var(name).ok()),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_type: ClientType::default(),
        }
    }

    /// Enable the last-resort CLI source.
    pub fn with_cli_fallback(mut self, cli: Arc<dyn CliTokenSource>) -> Self {
        self.cli = Some(cli);
        self
    }

    /// Replace the environment lookup.
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// OAuth client id used when no per-call id is given.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Kind of OAuth client `client_id` belongs to.
    pub fn with_client_type(mut self, client_type: ClientType) -> Self {
        self.client_type = client_type;
        self
    }

    /// First non-blank token from the environment, trimmed.
    pub fn token_from_env(&self) -> Option<(String, TokenSource)> {
        ENV_TOKEN_VARS.iter().find_map(|name| {
            let value = (self.env)(name)?;
            let value = value.trim();
            (!value.is_empty()).then(|| (value.to_string(), TokenSource::from_env_var(name)))
        })
    }

    /// Which environment variable would supply the token, if any.
    pub fn env_token_source(&self) -> Option<TokenSource> {
        self.token_from_env().map(|(_, source)| source)
    }

    /// Resolve through every source.
    ///
    /// `hostname` defaults to `github.com`; `client_id` defaults to the
    /// resolver's configured id.
    pub async fn resolve_token_full(
        &self,
        hostname: Option<&str>,
        client_id: Option<&str>,
    ) -> Option<ResolvedToken> {
        if let Some((token, source)) = self.token_from_env() {
            tracing::debug!(source = %source, "using token from environment");
            return Some(ResolvedToken::found(token, source));
        }

        let host = normalize_hostname(hostname.unwrap_or(DEFAULT_HOSTNAME));

        let refresh_error = match self.resolve_stored(&host, client_id).await {
            Ok(resolved) => return resolved,
            Err(reason) => reason,
        };

        if let Some(cli) = &self.cli {
            if let Some(token) = cli.token(&host).await {
                let token = token.trim();
                if !token.is_empty() {
                    tracing::debug!(host = %host, "using token from gh cli");
                    return Some(ResolvedToken {
                        refresh_error,
                        ..ResolvedToken::found(token.to_string(), TokenSource::GhCli)
                    });
                }
            }
        }

        refresh_error.map(ResolvedToken::unresolved)
    }

    /// Token string only.
    pub async fn resolve_token(&self, hostname: Option<&str>) -> Option<String> {
        self.resolve_token_full(hostname, None)
            .await
            .and_then(|resolved| resolved.token)
    }

    /// Stored credentials only, refreshing if expired.
    ///
    /// Skips the environment and the CLI fallback.
    pub async fn token_with_refresh(
        &self,
        hostname: &str,
        client_id: Option<&str>,
    ) -> Option<ResolvedToken> {
        let host = normalize_hostname(hostname);
        match self.resolve_stored(&host, client_id).await {
            Ok(resolved) => resolved,
            Err(reason) => reason.map(ResolvedToken::unresolved),
        }
    }

    /// Steps 2 and 3.
    ///
    /// `Ok(Some)` is a final answer. `Err(reason)` means "keep going", with
    /// the refresh error if one happened.
    async fn resolve_stored(
        &self,
        host: &str,
        client_id: Option<&str>,
    ) -> Result<Option<ResolvedToken>, Option<String>> {
        let found = match self.repository.get_credentials_with_source(host).await {
            Ok(Some(found)) => found,
            Ok(None) => return Err(None),
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "stored credentials unavailable");
                return Err(None);
            }
        };

        let SourcedCredentials {
            credentials,
            source,
        } = found;

        if !is_token_expired(&credentials) {
            return Ok(Some(ResolvedToken {
                username: Some(credentials.username),
                ..ResolvedToken::found(credentials.token.token, source.into())
            }));
        }

        tracing::debug!(host = %host, "stored token expired");
        let client_id = client_id.unwrap_or(&self.client_id);
        match refresh_credentials(
            &credentials,
            client_id,
            self.client_type,
            self.refresher.as_ref(),
            self.repository.as_ref(),
        )
        .await
        {
            Ok(updated) => Ok(Some(ResolvedToken {
                was_refreshed: true,
                username: Some(updated.username),
                ..ResolvedToken::found(updated.token.token, source.into())
            })),
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "cannot refresh stored token");
                Err(Some(e.to_string()))
            }
        }
    }
}

impl fmt::Debug for TokenResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResolver")
            .field("cli_fallback", &self.cli.is_some())
            .field("client_id", &self.client_id)
            .field("client_type", &self.client_type)
            .finish()
    }
}
