//! Raw submit-and-watch (`run` subcommand)
//!
//! The caller's arguments go to sbatch exactly as given; this tool only
//! reads the announcement line off the submission output and then babysits
//! the job id it finds there.

use anyhow::Result;
use clap::Args;
use slurmsub_client::{SchedulerClient, SlurmClient};
use tracing::info;

use crate::commands::report_outcome;
use crate::watch::{WatchArgs, watch_job};

/// Arguments for `run`
#[derive(Args)]
pub struct RunArgs {
    /// Arguments forwarded verbatim to sbatch (flags, script, script args)
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "SBATCH_ARGS"
    )]
    pub sbatch_args: Vec<String>,

    #[command(flatten)]
    pub watch: WatchArgs,
}

/// Submit and watch to completion
pub async fn handle_run(args: RunArgs) -> Result<u8> {
    let client = SlurmClient::new();

    let job_id = client.submit(&args.sbatch_args).await?;
    info!(job_id, "submission accepted, watching for completion");

    let code = watch_job(&client, job_id, &args.watch.to_config()).await?;
    report_outcome(job_id, code);
    Ok(code)
}
