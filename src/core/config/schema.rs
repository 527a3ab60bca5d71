//! core::config::schema
//!
//! Configuration schema types.
//!
//! Located at (in order of precedence):
//! 1. `$OCTOCODE_CONFIG` if set
//! 2. `~/.octocode/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing so that a typo (a zero
//! timeout, an empty service name) is reported instead of silently
//! disabling a backend.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// User configuration.
///
/// # Example
///
/// ```toml
/// [storage]
/// keychain = true
/// service = "octocode-cli"
/// keychain_timeout_secs = 3
/// cache_ttl_secs = 300
///
/// [oauth]
/// client_id = "178c6fc778ccc68e1d6a"
/// client_type = "oauth-app"
///
/// [fallback]
/// gh_cli = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Credential storage settings
    pub storage: Option<StorageConfig>,

    /// OAuth refresh settings
    pub oauth: Option<OAuthConfig>,

    /// Last-resort token sources
    pub fallback: Option<FallbackConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(storage) = &self.storage {
            storage.validate()?;
        }
        if let Some(oauth) = &self.oauth {
            oauth.validate()?;
        }
        Ok(())
    }
}

/// Credential storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Try the OS keychain before the encrypted file
    pub keychain: Option<bool>,

    /// Keychain service name
    pub service: Option<String>,

    /// Upper bound on a single keychain call
    pub keychain_timeout_secs: Option<u64>,

    /// How long a resolved credential stays in the in-process cache
    pub cache_ttl_secs: Option<u64>,
}

impl StorageConfig {
    /// Validate the storage configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(service) = &self.service {
            if service.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "storage.service must not be empty".into(),
                ));
            }
        }
        if self.keychain_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "storage.keychain_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.cache_ttl_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "storage.cache_ttl_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// OAuth refresh settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthConfig {
    /// OAuth app client ID used when exchanging refresh tokens
    pub client_id: Option<String>,

    /// "oauth-app" or "github-app"
    pub client_type: Option<String>,
}

/// Accepted `oauth.client_type` values.
pub const CLIENT_TYPES: &[&str] = &["oauth-app", "github-app"];

impl OAuthConfig {
    /// Validate the OAuth configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(client_id) = &self.client_id {
            if client_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "oauth.client_id must not be empty".into(),
                ));
            }
        }
        if let Some(client_type) = &self.client_type {
            if !CLIENT_TYPES.contains(&client_type.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "oauth.client_type must be one of {}, got '{}'",
                    CLIENT_TYPES.join(", "),
                    client_type
                )));
            }
        }
        Ok(())
    }
}

/// Last-resort token sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    /// Ask `gh auth token` when nothing else resolved
    pub gh_cli: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GlobalConfig::default();
        assert!(config.storage.is_none());
        assert!(config.oauth.is_none());
        assert!(config.fallback.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full() {
        let config: GlobalConfig = toml::from_str(
            r#"
            [storage]
            keychain = false
            service = "octocode-dev"
            keychain_timeout_secs = 5
            cache_ttl_secs = 60

            [oauth]
            client_id = "Iv1.abc"
            client_type = "github-app"

            [fallback]
            gh_cli = false
            "#,
        )
        .expect("parse");

        let storage = config.storage.as_ref().expect("storage");
        assert_eq!(storage.keychain, Some(false));
        assert_eq!(storage.service.as_deref(), Some("octocode-dev"));
        assert_eq!(storage.keychain_timeout_secs, Some(5));
        assert_eq!(storage.cache_ttl_secs, Some(60));
        assert_eq!(
            config.oauth.as_ref().and_then(|o| o.client_id.as_deref()),
            Some("Iv1.abc")
        );
        assert_eq!(
            config.oauth.as_ref().and_then(|o| o.client_type.as_deref()),
            Some("github-app")
        );
        assert_eq!(config.fallback.as_ref().and_then(|f| f.gh_cli), Some(false));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = StorageConfig {
            keychain_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ttl_rejected() {
        let config = StorageConfig {
            cache_ttl_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_service_rejected() {
        let config = StorageConfig {
            service: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_client_id_rejected() {
        let config = OAuthConfig {
            client_id: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<GlobalConfig, _> = toml::from_str("[storage]\nprovider = \"file\"");
        assert!(result.is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let config = GlobalConfig {
            storage: Some(StorageConfig {
                keychain: Some(true),
                ..Default::default()
            }),
            oauth: None,
            fallback: Some(FallbackConfig {
                gh_cli: Some(true),
            }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
