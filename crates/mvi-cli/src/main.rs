//! msgvault-install - fetch, verify and install msgvault

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mvi_cli::{Cli, Commands, cmd};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean for `hash`.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Hash { files }) => match cmd::hash::hash(files) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
        None => cmd::install::install(&cli).await,
    }
}
