//! cli::commands
//!
//! Command handlers. Each handler runs its async work through
//! [`Context::block_on`] and talks to [`crate::auth`] only.

mod hosts;
mod logout;
mod status;
mod store;
mod token;

use std::future::Future;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::args::Command;
use crate::auth::{
    ClientType, CredentialsStore, GhCliTokenSource, GitHubOAuthClient, TokenResolver,
};
use crate::core::config::Config;
use crate::core::paths::OctocodePaths;

/// How long a finished command waits for leftover blocking work.
///
/// A keychain call abandoned on timeout keeps its blocking thread busy;
/// the process exits without joining it.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Everything a command needs.
#[derive(Debug)]
pub struct Context {
    pub paths: OctocodePaths,
    pub config: Config,
    pub quiet: bool,
}

impl Context {
    /// Whether prompts may be shown.
    pub fn interactive(&self) -> bool {
        !self.quiet && std::io::stdin().is_terminal()
    }

    /// Run `future` on a fresh runtime, then shut the runtime down without
    /// waiting on blocking tasks past [`RUNTIME_SHUTDOWN_GRACE`].
    pub(crate) fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let rt = tokio::runtime::Runtime::new()?;
        let output = rt.block_on(future);
        rt.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
        Ok(output)
    }

    pub(crate) async fn credentials_store(&self) -> Arc<CredentialsStore> {
        Arc::new(CredentialsStore::from_config(&self.config, &self.paths).await)
    }

    /// Resolver over `store`, with the gh fallback when both the config and
    /// the caller allow it.
    pub(crate) fn resolver(
        &self,
        store: Arc<CredentialsStore>,
        cli_fallback: bool,
    ) -> Result<TokenResolver> {
        let client_type: ClientType = self
            .config
            .client_type()
            .parse()
            .map_err(anyhow::Error::msg)?;
        let resolver = TokenResolver::new(store, Arc::new(GitHubOAuthClient::new()))
            .with_client_id(self.config.client_id())
            .with_client_type(client_type);

        Ok(if cli_fallback && self.config.gh_cli_fallback() {
            resolver.with_cli_fallback(Arc::new(GhCliTokenSource::new()))
        } else {
            resolver
        })
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Token { host, no_fallback } => token::token(ctx, &host, no_fallback),
        Command::Status { host, json } => status::status(ctx, &host, json),
        Command::Store {
            host,
            username,
            token,
            git_protocol,
        } => store::store(
            ctx,
            &host,
            username.as_deref(),
            token.as_deref(),
            git_protocol.into(),
        ),
        Command::Logout { host } => logout::logout(ctx, &host),
        Command::Hosts => hosts::hosts(ctx),
    }
}
