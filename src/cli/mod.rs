//! cli
//!
//! Command-line interface layer for octocode-creds.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Load configuration and delegate to command handlers
//!
//! The CLI layer is thin. Every credential decision is made by
//! [`crate::auth`].

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::paths::OctocodePaths;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.debug);

    let paths = match &cli.home {
        Some(dir) => OctocodePaths::new(dir.clone()),
        None => OctocodePaths::from_home().context("Cannot determine home directory")?,
    };
    let config = Config::load(&paths).context("Failed to load configuration")?;

    let ctx = commands::Context {
        paths,
        config,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr; `RUST_LOG` overrides the default unless `--debug` is set.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("octocode_credentials=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "octocode_credentials=warn".into())
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
