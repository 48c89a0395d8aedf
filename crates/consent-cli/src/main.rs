//! consent-embed: command-line tooling for the embedded cookie banner.
//!
//! Previews the iframe a page would create, validates config, works with
//! the `cookie_preferences` cookie, probes the consent API, and runs the
//! full handshake against an in-memory page.

mod cli;
mod commands;

use std::path::Path;
use std::process::ExitCode;

use consent_config::{load_default, load_from_path};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG: &str = "consent=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::parse();

    let filter = match &args.log_level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => load_from_path(Path::new(path)),
        None => load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    match commands::run(args.command, config).await {
        Ok(output) => {
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{text}"),
                Err(e) => println!("{output}\n(pretty print failed: {e})"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
