//! auth - credential resolution for the GitHub API
//!
//! Produces a valid, non-expired token for a host from, in order: the
//! environment, the OS keychain, the encrypted credentials file, and the
//! GitHub CLI.
//!
//! # Architecture
//!
//! The auth system:
//! - Keys every backend by normalized hostname
//! - Keeps one [`StoredCredentials`] record per host in the keychain or the
//!   encrypted file, fronted by a TTL [`CredentialCache`]
//! - Copies file-only records into the keychain in the background
//! - Refreshes expired OAuth tokens through a [`RefreshProvider`]
//! - Never exposes tokens in logs, errors, or debug output
//!
//! # Components
//!
//! - [`normalize_hostname`] - canonical lookup key
//! - [`CredentialsStore`] - keychain + file + cache, implements [`CredentialRepository`]
//! - [`refresh_credentials`] - refresh-token exchange and persistence
//! - [`GitHubOAuthClient`] - HTTP implementation of [`RefreshProvider`]
//! - [`GhCliTokenSource`] - `gh auth token` implementation of [`CliTokenSource`]
//! - [`TokenResolver`] - the full priority chain
//!
//! # Security
//!
//! Tokens MUST never appear in:
//! - logs (including `--debug`)
//! - error messages
//! - debug output
//!
//! Every type holding a token implements a redacting `Debug`.

pub mod cache;
mod credentials;
mod errors;
pub mod expiry;
mod file_backend;
mod gh_cli;
mod hostname;
pub mod migration;
mod oauth;
mod refresh;
mod resolver;
mod store;

pub use cache::{CacheEntry, CredentialCache, DEFAULT_CACHE_TTL};
pub use credentials::{
    format_timestamp, CredentialDocument, GitProtocol, OAuthToken, StoredCredentials,
    DOCUMENT_VERSION, TOKEN_TYPE_OAUTH,
};
pub use errors::{CredentialsError, RefreshError};
pub use expiry::{is_refresh_token_expired, is_token_expired};
pub use file_backend::CredentialFileStore;
pub use gh_cli::{CliTokenSource, GhCliTokenSource, DEFAULT_GH_TIMEOUT};
pub use hostname::{normalize_hostname, DEFAULT_HOSTNAME};
pub use migration::{migrate_if_possible, MigrationFence, MigrationTicket};
pub use oauth::GitHubOAuthClient;
pub use refresh::{
    merge_refreshed, refresh_credentials, ClientType, RefreshProvider, RefreshRequest,
    RefreshedTokens,
};
pub use resolver::{EnvLookup, ResolvedToken, TokenResolver, TokenSource, ENV_TOKEN_VARS};
pub use store::{CredentialRepository, CredentialSource, CredentialsStore, SourcedCredentials};
