//! cli::commands::store
//!
//! Store a token for a host.
//!
//! # Example
//!
//! ```bash
//! # Interactive (prompts for token)
//! octocode-creds store
//!
//! # Non-interactive
//! octocode-creds store --host ghe.example.com --username octocat --token ghp_xxxx
//! ```
//!
//! The token is never echoed back.

use std::io::{self, Write};

use super::Context;
use crate::auth::{
    normalize_hostname, CredentialRepository, CredentialSource, GitProtocol, OAuthToken,
    StoredCredentials,
};
use anyhow::{bail, Context as _, Result};

/// Run the store command.
pub fn store(
    ctx: &Context,
    host: &str,
    username: Option<&str>,
    token: Option<&str>,
    git_protocol: GitProtocol,
) -> Result<()> {
    let token_value = get_token(ctx, host, token)?;
    validate_token(&token_value)?;

    let record = StoredCredentials::new(
        host,
        username.unwrap_or_default(),
        OAuthToken::new(token_value),
    )
    .with_git_protocol(git_protocol);

    let source = ctx.block_on(async {
        let store = ctx.credentials_store().await;
        store.store_credentials(&record).await
    })??;

    if !ctx.quiet {
        let host = normalize_hostname(host);
        match source {
            CredentialSource::Keychain => {
                println!("Credentials for {} stored in the OS keychain.", host)
            }
            CredentialSource::File => println!(
                "Credentials for {} stored in {}.",
                host,
                ctx.paths.credentials_file().display()
            ),
        }
    }

    Ok(())
}

/// Get token from argument or interactive prompt.
fn get_token(ctx: &Context, host: &str, token_arg: Option<&str>) -> Result<String> {
    if let Some(t) = token_arg {
        return Ok(t.trim().to_string());
    }

    if !ctx.interactive() {
        bail!("Token required. Use --token <TOKEN> or run interactively.");
    }

    print!("GitHub token for {}: ", normalize_hostname(host));
    io::stdout().flush()?;

    let token = rpassword::read_password().context("Failed to read token")?;
    let token = token.trim();

    if token.is_empty() {
        bail!("Token cannot be empty.");
    }

    Ok(token.to_string())
}

/// Validate token format (basic checks).
///
/// No network access: the token is not checked against the API.
fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("Token cannot be empty.");
    }

    if token.len() < 10 {
        bail!("Token appears to be too short.");
    }

    if token.contains(' ') {
        bail!("Token should not contain spaces.");
    }

    if token.contains('\n') || token.contains('\r') {
        bail!("Token should not contain newlines.");
    }

    Ok(())
}
