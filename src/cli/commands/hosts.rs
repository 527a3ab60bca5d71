//! cli::commands::hosts
//!
//! List hosts with stored credentials, one per line.

use super::Context;
use anyhow::Result;

/// Run the hosts command.
pub fn hosts(ctx: &Context) -> Result<()> {
    let hosts = ctx.block_on(async {
        let store = ctx.credentials_store().await;
        store.list_stored_hosts().await
    })??;

    if hosts.is_empty() {
        if !ctx.quiet {
            println!("No stored credentials.");
        }
        return Ok(());
    }

    for host in hosts {
        println!("{}", host);
    }

    Ok(())
}
