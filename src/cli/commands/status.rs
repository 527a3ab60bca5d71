//! cli::commands::status
//!
//! Report where the token for a host comes from.
//!
//! # Security
//!
//! Never prints the token or any part of it.

use std::path::PathBuf;

use super::Context;
use crate::auth::{normalize_hostname, CredentialsStore, ResolvedToken, TokenSource};
use anyhow::Result;
use serde::Serialize;

/// Machine-readable status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    host: String,
    authenticated: bool,
    source: TokenSource,
    username: Option<String>,
    was_refreshed: bool,
    refresh_error: Option<String>,
    expires_at: Option<String>,
    storage: &'static str,
    credentials_file: PathBuf,
}

/// Run the status command.
pub fn status(ctx: &Context, host: &str, json: bool) -> Result<()> {
    let report = ctx.block_on(collect(ctx, host))??;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if ctx.quiet {
        println!(
            "{}",
            if report.authenticated {
                "authenticated"
            } else {
                "not_authenticated"
            }
        );
    } else {
        print_report(&report);
    }

    Ok(())
}

async fn collect(ctx: &Context, host: &str) -> Result<StatusReport> {
    let host = normalize_hostname(host);
    let store = ctx.credentials_store().await;
    let resolver = ctx.resolver(store.clone(), true)?;

    let resolved = resolver.resolve_token_full(Some(&host), None).await;
    let expires_at = stored_expiry(&store, &host, resolved.as_ref()).await;

    let storage = if store.is_using_secure_storage() {
        store.keychain().backend_name()
    } else {
        "encrypted-file"
    };

    let report = match resolved {
        Some(resolved) => StatusReport {
            authenticated: resolved.token.is_some(),
            source: resolved.source,
            username: resolved.username,
            was_refreshed: resolved.was_refreshed,
            refresh_error: resolved.refresh_error,
            expires_at,
            storage,
            credentials_file: store.credentials_file_path().to_path_buf(),
            host,
        },
        None => StatusReport {
            authenticated: false,
            source: TokenSource::None,
            username: None,
            was_refreshed: false,
            refresh_error: None,
            expires_at: None,
            storage,
            credentials_file: store.credentials_file_path().to_path_buf(),
            host,
        },
    };

    Ok(report)
}

/// Expiry of the stored token, when the token came from storage.
async fn stored_expiry(
    store: &CredentialsStore,
    host: &str,
    resolved: Option<&ResolvedToken>,
) -> Option<String> {
    let from_storage = matches!(
        resolved.map(|r| r.source),
        Some(TokenSource::Keychain | TokenSource::File)
    );
    if !from_storage {
        return None;
    }

    match store.get_credentials(host).await {
        Ok(Some(record)) => record.token.expires_at,
        _ => None,
    }
}

fn print_report(report: &StatusReport) {
    if report.authenticated {
        println!("Authenticated with {}.", report.host);
        // Intentionally no token output, not even a prefix.
        println!("  Source:  {}", report.source);
        if let Some(username) = &report.username {
            println!("  User:    {}", username);
        }
        match &report.expires_at {
            Some(at) => println!("  Expires: {}", at),
            None if report.source.is_env() || report.source == TokenSource::GhCli => {}
            None => println!("  Expires: never"),
        }
        if report.was_refreshed {
            println!("  Token was refreshed.");
        }
    } else {
        println!("Not authenticated with {}.", report.host);
        if let Some(reason) = &report.refresh_error {
            println!("  Refresh failed: {}", reason);
        }
        println!(
            "Run 'octocode-creds store --host {}' to authenticate.",
            report.host
        );
    }

    if report.storage == "encrypted-file" {
        println!("  Storage: {}", report.credentials_file.display());
    } else {
        println!("  Storage: {}", report.storage);
    }
}
