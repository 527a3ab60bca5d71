//! Octocode credentials - GitHub token resolution for Octocode tools
//!
//! Finds a usable token for a GitHub host and keeps it usable: stored
//! OAuth tokens are refreshed when they expire, file-only records are moved
//! into the OS keychain, and nothing secret is ever written in plaintext.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to auth)
//! - [`auth`] - Hostname keys, credential records, storage, refresh and resolution
//! - [`secrets`] - Keychain access and AES-256-GCM encryption at rest
//! - [`core`] - Storage paths and configuration
//!
//! # Resolution order
//!
//! 1. `OCTOCODE_TOKEN`, `GH_TOKEN`, `GITHUB_TOKEN`
//! 2. OS keychain
//! 3. Encrypted file `~/.octocode/credentials.json`
//! 4. `gh auth token`

pub mod auth;
pub mod cli;
pub mod core;
pub mod secrets;
