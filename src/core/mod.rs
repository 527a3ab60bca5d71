//! core
//!
//! Storage layout and configuration.
//!
//! # Modules
//!
//! - [`paths`] - Centralized path routing for `~/.octocode`
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod paths;
