//! cli::commands::logout
//!
//! Remove stored credentials for a host from every backend.

use super::Context;
use crate::auth::normalize_hostname;
use anyhow::{Context as _, Result};

/// Run the logout command.
pub fn logout(ctx: &Context, host: &str) -> Result<()> {
    let host = normalize_hostname(host);

    let (removed, env_source) = ctx.block_on(async {
        let store = ctx.credentials_store().await;
        let removed = store
            .delete_credentials(&host)
            .await
            .context("Failed to remove stored credentials")?;
        let env_source = ctx.resolver(store, false)?.env_token_source();
        anyhow::Ok((removed, env_source))
    })??;

    if ctx.quiet {
        return Ok(());
    }

    if removed {
        println!("Logged out from {}.", host);
    } else {
        println!("No stored credentials for {}.", host);
    }

    if let Some(source) = env_source {
        // Stored credentials are gone but resolution still succeeds.
        println!("Note: a token is still provided by {}.", source);
    }

    Ok(())
}
