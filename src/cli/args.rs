//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--home <path>`: Use this directory instead of `~/.octocode`
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::auth::{GitProtocol, DEFAULT_HOSTNAME};

/// octocode-creds - manage and resolve Octocode GitHub credentials
#[derive(Parser, Debug)]
#[command(name = "octocode-creds")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding credentials and config (default: ~/.octocode)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; never prompt
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a token for a host
    #[command(
        name = "token",
        long_about = "Resolve a token and print it to stdout.\n\n\
            Sources are tried in order: OCTOCODE_TOKEN, GH_TOKEN, GITHUB_TOKEN, \
            the OS keychain, the encrypted credentials file, and finally \
            'gh auth token'. Expired OAuth tokens are refreshed automatically.",
        after_help = "\
EXAMPLES:
    # Use the resolved token with curl
    curl -H \"Authorization: Bearer $(octocode-creds token)\" https://api.github.com/user

    # GitHub Enterprise
    octocode-creds token --host ghe.example.com"
    )]
    Token {
        /// GitHub host
        #[arg(long, default_value = DEFAULT_HOSTNAME)]
        host: String,

        /// Do not fall back to 'gh auth token'
        #[arg(long)]
        no_fallback: bool,
    },

    /// Show where the token for a host comes from
    Status {
        /// GitHub host
        #[arg(long, default_value = DEFAULT_HOSTNAME)]
        host: String,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Store a token for a host
    #[command(
        name = "store",
        long_about = "Store a token for a host.\n\n\
            The token goes to the OS keychain when one is available and to the \
            encrypted file ~/.octocode/credentials.json otherwise. Without \
            --token you are prompted for it with hidden input."
    )]
    Store {
        /// GitHub host
        #[arg(long, default_value = DEFAULT_HOSTNAME)]
        host: String,

        /// GitHub login the token belongs to
        #[arg(long)]
        username: Option<String>,

        /// Token value (prompted for if omitted)
        #[arg(long)]
        token: Option<String>,

        /// Preferred git transport
        #[arg(long, value_enum, default_value_t = GitProtocolArg::Https)]
        git_protocol: GitProtocolArg,
    },

    /// Remove stored credentials for a host
    Logout {
        /// GitHub host
        #[arg(long, default_value = DEFAULT_HOSTNAME)]
        host: String,
    },

    /// List hosts with stored credentials
    Hosts,
}

/// Git transport argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum GitProtocolArg {
    Ssh,
    Https,
}

impl From<GitProtocolArg> for GitProtocol {
    fn from(arg: GitProtocolArg) -> Self {
        match arg {
            GitProtocolArg::Ssh => GitProtocol::Ssh,
            GitProtocolArg::Https => GitProtocol::Https,
        }
    }
}
