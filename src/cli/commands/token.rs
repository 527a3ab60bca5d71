//! cli::commands::token
//!
//! Print the resolved token for a host.
//!
//! The token is the only thing written to stdout so the command can be used
//! in `$(...)`.

use super::Context;
use crate::auth::{normalize_hostname, ResolvedToken};
use anyhow::{bail, Result};

/// Run the token command.
pub fn token(ctx: &Context, host: &str, no_fallback: bool) -> Result<()> {
    ctx.block_on(token_async(ctx, host, no_fallback))?
}

async fn token_async(ctx: &Context, host: &str, no_fallback: bool) -> Result<()> {
    let host = normalize_hostname(host);
    let store = ctx.credentials_store().await;
    let resolver = ctx.resolver(store, !no_fallback)?;

    match resolver.resolve_token_full(Some(&host), None).await {
        Some(ResolvedToken {
            token: Some(token),
            source,
            was_refreshed,
            ..
        }) => {
            tracing::debug!(host = %host, source = %source, was_refreshed, "token resolved");
            println!("{}", token);
            Ok(())
        }
        Some(ResolvedToken {
            refresh_error: Some(reason),
            ..
        }) => bail!(
            "Token for {} has expired and could not be refreshed: {}\nRun 'octocode-creds store --host {}' to store a new one.",
            host,
            reason,
            host
        ),
        _ => bail!(
            "No token found for {}. Set OCTOCODE_TOKEN or run 'octocode-creds store --host {}'.",
            host,
            host
        ),
    }
}
