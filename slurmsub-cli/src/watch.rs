//! Job completion watcher
//!
//! The scheduler's own blocking-wait primitive is unreliable, so completion
//! is determined by repeated state inspection instead: poll the controller,
//! classify every task, and only settle once nothing can change anymore.
//! A job the controller no longer knows is resolved through the accounting
//! history.

use anyhow::{Result, bail};
use slurmsub_client::SchedulerClient;
use slurmsub_core::domain::job::JobId;
use slurmsub_core::outcome;
use slurmsub_core::parse::{self, Inspection};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Watcher timing configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Delay between polls while any task is still active.
    pub poll_interval: Duration,

    /// Longer delay after the controller answers with no task records for
    /// a job it claims to know.
    pub empty_retry_interval: Duration,

    /// Optional wall-clock bound. `None` polls until the job settles.
    pub timeout: Option<Duration>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            empty_retry_interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

/// Command-line knobs for the watcher, shared by every waiting subcommand.
#[derive(Debug, clap::Args)]
pub struct WatchArgs {
    /// Seconds between polls while tasks are still active
    #[arg(long, default_value_t = 2)]
    pub poll_interval: u64,

    /// Give up after this many seconds (default: poll until the job settles)
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl WatchArgs {
    pub fn to_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_secs(self.poll_interval),
            timeout: self.timeout.map(Duration::from_secs),
            ..WatchConfig::default()
        }
    }
}

/// Polls the scheduler until `job_id` settles and returns the process exit
/// status derived for it.
pub async fn watch_job(
    client: &dyn SchedulerClient,
    job_id: JobId,
    config: &WatchConfig,
) -> Result<u8> {
    let started = Instant::now();
    loop {
        let output = client.inspect(job_id).await?;
        let delay = match parse::parse_inspection(&output) {
            Inspection::UnknownJob => {
                info!(job_id, "controller does not know the job, consulting accounting");
                let history = client.query_history(job_id).await?;
                let codes = parse::parse_accounting(&history);
                debug!(job_id, ?codes, "recorded exit codes");
                return Ok(outcome::resolve_history(&codes));
            }
            Inspection::Snapshot(snapshot) => {
                if snapshot.running() > 0 {
                    debug!(
                        job_id,
                        running = snapshot.running(),
                        total = snapshot.total(),
                        "tasks still active"
                    );
                    config.poll_interval
                } else if snapshot.total() == 0 {
                    // Recognized job but no records: a controller hiccup,
                    // never a final answer.
                    warn!(job_id, "controller returned no task records, retrying");
                    config.empty_retry_interval
                } else {
                    debug!(
                        job_id,
                        total = snapshot.total(),
                        failed = snapshot.failed(),
                        "job settled"
                    );
                    return Ok(outcome::aggregate(&snapshot));
                }
            }
        };
        if let Some(limit) = config.timeout {
            if started.elapsed() >= limit {
                bail!("job {job_id} did not settle within {}s", limit.as_secs());
            }
        }
        sleep(delay).await;
    }
}
