//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$OCTOCODE_CONFIG` if set
//! 2. `~/.octocode/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use octocode_credentials::core::config::Config;
//! use octocode_credentials::core::paths::OctocodePaths;
//!
//! let paths = OctocodePaths::from_home().unwrap();
//! let config = Config::load(&paths).unwrap();
//!
//! println!("Keychain service: {}", config.keychain_service());
//! println!("Cache TTL: {:?}", config.cache_ttl());
//! ```

pub mod schema;

pub use schema::{FallbackConfig, GlobalConfig, OAuthConfig, StorageConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::OctocodePaths;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "OCTOCODE_CONFIG";

/// Default keychain service name.
pub const DEFAULT_SERVICE: &str = "octocode-cli";

/// Default OAuth client ID used for refresh token exchange.
pub const DEFAULT_CLIENT_ID: &str = "178c6fc778ccc68e1d6a";

/// Default OAuth client type for refresh token exchange.
pub const DEFAULT_CLIENT_TYPE: &str = "oauth-app";

/// Default keychain call timeout in seconds.
pub const DEFAULT_KEYCHAIN_TIMEOUT_SECS: u64 = 3;

/// Default credential cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration.
///
/// Accessor methods apply defaults, so callers never see an unset value.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed configuration
    pub global: GlobalConfig,
    /// Path the configuration was loaded from (if any)
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(paths: &OctocodePaths) -> Result<Self, ConfigError> {
        let override_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::load_with_override(override_path.as_deref(), paths)
    }

    /// Load configuration, preferring `override_path` when it exists.
    pub fn load_with_override(
        override_path: Option<&Path>,
        paths: &OctocodePaths,
    ) -> Result<Self, ConfigError> {
        let candidates = override_path
            .map(Path::to_path_buf)
            .into_iter()
            .chain(std::iter::once(paths.config_file()));

        for path in candidates {
            if path.exists() {
                let global = Self::read_config(&path)?;
                global.validate()?;
                return Ok(Self {
                    global,
                    loaded_from: Some(path),
                });
            }
        }

        Ok(Self::default())
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Whether the OS keychain should be tried.
    ///
    /// Defaults to `true`.
    pub fn keychain_enabled(&self) -> bool {
        self.global
            .storage
            .as_ref()
            .and_then(|s| s.keychain)
            .unwrap_or(true)
    }

    /// Keychain service name.
    ///
    /// Defaults to "octocode-cli".
    pub fn keychain_service(&self) -> &str {
        self.global
            .storage
            .as_ref()
            .and_then(|s| s.service.as_deref())
            .unwrap_or(DEFAULT_SERVICE)
    }

    /// Upper bound on a single keychain call.
    ///
    /// Defaults to 3 seconds.
    pub fn keychain_timeout(&self) -> Duration {
        Duration::from_secs(
            self.global
                .storage
                .as_ref()
                .and_then(|s| s.keychain_timeout_secs)
                .unwrap_or(DEFAULT_KEYCHAIN_TIMEOUT_SECS),
        )
    }

    /// Credential cache TTL.
    ///
    /// Defaults to 5 minutes.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.global
                .storage
                .as_ref()
                .and_then(|s| s.cache_ttl_secs)
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        )
    }

    /// OAuth client ID for refresh token exchange.
    pub fn client_id(&self) -> &str {
        self.global
            .oauth
            .as_ref()
            .and_then(|o| o.client_id.as_deref())
            .unwrap_or(DEFAULT_CLIENT_ID)
    }

    /// Kind of OAuth client the client ID belongs to.
    ///
    /// Defaults to "oauth-app". Validated on load.
    pub fn client_type(&self) -> &str {
        self.global
            .oauth
            .as_ref()
            .and_then(|o| o.client_type.as_deref())
            .unwrap_or(DEFAULT_CLIENT_TYPE)
    }

    /// Whether the `gh auth token` fallback may be used.
    ///
    /// Defaults to `true`.
    pub fn gh_cli_fallback(&self) -> bool {
        self.global
            .fallback
            .as_ref()
            .and_then(|f| f.gh_cli)
            .unwrap_or(true)
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }
}
