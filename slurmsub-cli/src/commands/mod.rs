//! Commands module
//!
//! Defines all CLI commands and their handlers. Every handler returns the
//! exit code the process should finish with.

mod run;
mod submit;
mod wait;

pub use run::RunArgs;
pub use submit::SubmitArgs;
pub use wait::WaitArgs;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use slurmsub_core::domain::job::JobId;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a job with arguments forwarded verbatim to sbatch, then
    /// watch it to completion
    Run(RunArgs),
    /// Build an array script from a list of commands and submit it
    Submit(SubmitArgs),
    /// Watch an already-submitted job until it settles
    Wait(WaitArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module and returns the
/// exit code the process should finish with.
pub async fn handle_command(command: Commands) -> Result<u8> {
    match command {
        Commands::Run(args) => run::handle_run(args).await,
        Commands::Submit(args) => submit::handle_submit(args).await,
        Commands::Wait(args) => wait::handle_wait(args).await,
    }
}

/// Print the final one-line verdict for a watched job.
///
/// Goes to stderr: stdout carries the submission tool's output through
/// unchanged.
pub(crate) fn report_outcome(job_id: JobId, code: u8) {
    if code == 0 {
        eprintln!(
            "{} job {} completed successfully",
            "✓".green(),
            job_id.to_string().bold()
        );
    } else {
        eprintln!(
            "{} job {} finished with exit code {}",
            "✗".red(),
            job_id.to_string().bold(),
            code
        );
    }
}
