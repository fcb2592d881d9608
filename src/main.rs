//! short - a command-line client for Shortcut

use std::process::ExitCode;

use short_cli::cli::{exit_code, is_broken_pipe};

#[tokio::main]
async fn main() -> ExitCode {
    match short_cli::cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        // A reader such as `head` went away; the output it wanted was written
        Err(e) if is_broken_pipe(&e) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
