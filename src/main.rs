//! octocode-creds binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match octocode_credentials::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
