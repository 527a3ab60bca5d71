//! auth::gh_cli
//!
//! Last-resort token source: the GitHub CLI.
//!
//! The resolver depends only on [`CliTokenSource`]. [`GhCliTokenSource`] runs
//! `gh auth token --hostname <host>` and turns every failure (binary missing,
//! non-zero exit, timeout, non-UTF-8 output, blank output) into `None`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Upper bound on one `gh` invocation.
pub const DEFAULT_GH_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can produce a bearer token for a host, or nothing.
#[async_trait]
pub trait CliTokenSource: Send + Sync {
    async fn token(&self, hostname: &str) -> Option<String>;
}

/// `gh auth token` subprocess.
#[derive(Debug, Clone)]
pub struct GhCliTokenSource {
    program: String,
    timeout: Duration,
}

impl Default for GhCliTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GhCliTokenSource {
    pub fn new() -> Self {
        Self::with_program("gh")
    }

    /// Use a different executable in place of `gh`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_GH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CliTokenSource for GhCliTokenSource {
    async fn token(&self, hostname: &str) -> Option<String> {
        let output = Command::new(&self.program)
            .args(["auth", "token", "--hostname", hostname])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!(program = %self.program, error = %e, "gh cli not runnable");
                return None;
            }
            Err(_) => {
                tracing::debug!(program = %self.program, "gh cli timed out");
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(status = ?output.status.code(), "gh cli returned no token");
            return None;
        }

        let token = String::from_utf8(output.stdout).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_yields_none() {
        let source = GhCliTokenSource::with_program("octocode-definitely-not-a-binary");
        assert!(source.token("github.com").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_hostname_and_trims_output() {
        // `echo` prints its arguments, standing in for `gh`.
        let source = GhCliTokenSource::with_program("echo");
        assert_eq!(
            source.token("ghe.corp").await.as_deref(),
            Some("auth token --hostname ghe.corp")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_yields_none() {
        let source = GhCliTokenSource::with_program("false");
        assert!(source.token("github.com").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_output_yields_none() {
        let source = GhCliTokenSource::with_program("true");
        assert!(source.token("github.com").await.is_none());
    }

    #[test]
    fn defaults() {
        let source = GhCliTokenSource::default();
        assert_eq!(source.program, "gh");
        assert_eq!(source.timeout, DEFAULT_GH_TIMEOUT);
    }
}
