//! Watch an existing job (`wait` subcommand)

use anyhow::Result;
use clap::Args;
use slurmsub_client::SlurmClient;
use slurmsub_core::domain::job::JobId;

use crate::commands::report_outcome;
use crate::watch::{WatchArgs, watch_job};

/// Arguments for `wait`
#[derive(Args)]
pub struct WaitArgs {
    /// The scheduler-assigned job id to watch
    pub job_id: JobId,

    #[command(flatten)]
    pub watch: WatchArgs,
}

/// Watch a job that was submitted elsewhere
pub async fn handle_wait(args: WaitArgs) -> Result<u8> {
    let client = SlurmClient::new();
    let code = watch_job(&client, args.job_id, &args.watch.to_config()).await?;
    report_outcome(args.job_id, code);
    Ok(code)
}
