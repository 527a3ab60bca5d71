//! core::paths
//!
//! Centralized path routing for Octocode storage locations.
//!
//! # Storage Layout
//!
//! All Octocode data is stored under `~/.octocode/`:
//! - `.key` - hex-encoded 256-bit encryption key (0600)
//! - `credentials.json` - encrypted credential document (0600)
//! - `config.toml` - user configuration
//!
//! **Hard rule:** No code outside this module should compute
//! `*.join(".octocode")` paths.
//!
//! # Example
//!
//! ```
//! use octocode_credentials::core::paths::OctocodePaths;
//! use std::path::PathBuf;
//!
//! let paths = OctocodePaths::new(PathBuf::from("/home/dev/.octocode"));
//!
//! assert_eq!(
//!     paths.credentials_file(),
//!     PathBuf::from("/home/dev/.octocode/credentials.json")
//! );
//! ```

use std::path::{Path, PathBuf};

/// Name of the Octocode directory inside the home directory.
pub const OCTOCODE_DIR: &str = ".octocode";

/// Centralized path routing for Octocode storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctocodePaths {
    /// The `.octocode` directory.
    root: PathBuf,
}

impl OctocodePaths {
    /// Create paths rooted at an explicit directory.
    ///
    /// Tests use this with a temporary directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Paths under the current user's home directory.
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn from_home() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(OCTOCODE_DIR)))
    }

    /// The `.octocode` directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the encryption key file.
    ///
    /// This is `<root>/.key`.
    pub fn key_file(&self) -> PathBuf {
        self.root.join(".key")
    }

    /// Path to the encrypted credentials document.
    ///
    /// This is `<root>/credentials.json`.
    pub fn credentials_file(&self) -> PathBuf {
        self.root.join("credentials.json")
    }

    /// Path to the user configuration file.
    ///
    /// This is `<root>/config.toml`.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> OctocodePaths {
        OctocodePaths::new(PathBuf::from("/home/dev/.octocode"))
    }

    #[test]
    fn key_file() {
        assert_eq!(paths().key_file(), PathBuf::from("/home/dev/.octocode/.key"));
    }

    #[test]
    fn credentials_file() {
        assert_eq!(
            paths().credentials_file(),
            PathBuf::from("/home/dev/.octocode/credentials.json")
        );
    }

    #[test]
    fn config_file() {
        assert_eq!(
            paths().config_file(),
            PathBuf::from("/home/dev/.octocode/config.toml")
        );
    }

    #[test]
    fn root_accessor() {
        assert_eq!(paths().root(), Path::new("/home/dev/.octocode"));
    }

    #[test]
    fn from_home_ends_with_octocode_dir() {
        if let Some(paths) = OctocodePaths::from_home() {
            assert!(paths.root().ends_with(OCTOCODE_DIR));
        }
    }
}
