//! slurmsub CLI
//!
//! Submits batch jobs to SLURM and determines their real outcome.
//!
//! The scheduler's blocking-wait feature is known to be unreliable, so this
//! tool never uses it: it submits, extracts the job id from the submission
//! output, then repeatedly inspects the controller until every task has
//! reached a terminal state, and turns what it saw into the process exit
//! code. Jobs that have already left the controller are resolved through
//! the accounting interface.

mod commands;
mod script;
mod watch;

use clap::Parser;
use commands::{Commands, handle_command};
use slurmsub_client::ClientError;
use slurmsub_core::outcome::EXIT_SUBMIT_FAILED;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "slurmsub")]
#[command(version, about = "SLURM job submission with reliable completion detection")]
struct Cli {
    /// Suppress most logging messages
    #[arg(short = 'z', long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr: stdout belongs to the submission
    // passthrough and must stay byte-clean.
    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match handle_command(cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("{err:#}");
            match err.downcast_ref::<ClientError>() {
                Some(client_err) if client_err.is_submission_parse() => {
                    ExitCode::from(EXIT_SUBMIT_FAILED)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}
