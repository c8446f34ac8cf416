//! Scheduler command client
//!
//! Wraps the three external SLURM tools behind one trait so the
//! submit-and-watch state machine can be driven by deterministic fakes in
//! tests instead of a real cluster:
//! - `sbatch` submits the job,
//! - `scontrol show job` is the primary state inspection,
//! - `sacct` is the secondary, accounting-backed history query.
//!
//! The client only runs commands and captures text. Interpreting that text
//! is `slurmsub-core`'s job, with one exception: `submit` extracts the job
//! id on the fly while it streams the submission output through.

pub mod error;

pub use error::{ClientError, Result};

use async_trait::async_trait;
use slurmsub_core::domain::job::JobId;
use slurmsub_core::parse;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Interface to the batch scheduler.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    /// Submits a job, forwarding `args` verbatim to the submission tool,
    /// and returns the scheduler-assigned job id.
    ///
    /// The submission tool's stdout must reach the caller's stdout
    /// unchanged whether or not an id is found.
    async fn submit(&self, args: &[String]) -> Result<JobId>;

    /// Returns the raw primary-inspection output for `job_id`.
    async fn inspect(&self, job_id: JobId) -> Result<String>;

    /// Returns the raw accounting output for `job_id`.
    async fn query_history(&self, job_id: JobId) -> Result<String>;
}

/// Production client that shells out to the SLURM tools.
#[derive(Debug, Clone)]
pub struct SlurmClient {
    submit_command: String,
    inspect_command: String,
    accounting_command: String,
}

impl SlurmClient {
    /// Create a client using the standard tool names from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client with explicit tool names.
    ///
    /// Mainly useful for tests and for clusters where the tools live
    /// behind wrapper scripts.
    pub fn with_commands(
        submit: impl Into<String>,
        inspect: impl Into<String>,
        accounting: impl Into<String>,
    ) -> Self {
        Self {
            submit_command: submit.into(),
            inspect_command: inspect.into(),
            accounting_command: accounting.into(),
        }
    }

    /// The submission command name
    pub fn submit_command(&self) -> &str {
        &self.submit_command
    }

    /// Runs a query command to completion and returns stdout and stderr
    /// combined. A nonzero exit is not an error at this layer: the
    /// interesting diagnostics (e.g. unknown-job messages) arrive on
    /// stderr with a failing status, and the caller classifies the text.
    async fn capture(&self, command: &str, args: &[String]) -> Result<String> {
        debug!(command, ?args, "running scheduler query");
        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ClientError::spawn(command, e))?;

        if !output.status.success() {
            debug!(command, status = ?output.status.code(), "query exited nonzero");
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok(text)
    }
}

impl Default for SlurmClient {
    fn default() -> Self {
        Self {
            submit_command: "sbatch".to_string(),
            inspect_command: "scontrol".to_string(),
            accounting_command: "sacct".to_string(),
        }
    }
}

#[async_trait]
impl SchedulerClient for SlurmClient {
    async fn submit(&self, args: &[String]) -> Result<JobId> {
        debug!(command = %self.submit_command, ?args, "submitting job");
        let mut child = Command::new(&self.submit_command)
            .args(args)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ClientError::spawn(&self.submit_command, e))?;

        // Stream the submission output through unchanged, scanning each
        // line for the job id as it goes by. stderr is inherited and flows
        // to the caller on its own.
        let stdout = child.stdout.take().expect("child stdout was piped");
        let job_id =
            stream_and_extract(BufReader::new(stdout), tokio::io::stdout()).await?;

        // The submission tool's own exit status is not a success signal;
        // the extracted id is the only thing trusted from here on.
        match child.wait().await {
            Ok(status) if !status.success() => {
                warn!(command = %self.submit_command, status = ?status.code(), "submission tool exited nonzero");
            }
            Err(e) => {
                warn!(command = %self.submit_command, error = %e, "could not collect submission tool status");
            }
            Ok(_) => {}
        }

        job_id.ok_or_else(|| ClientError::NoJobId {
            command: self.submit_command.clone(),
        })
    }

    async fn inspect(&self, job_id: JobId) -> Result<String> {
        let args = vec!["show".to_string(), "job".to_string(), job_id.to_string()];
        self.capture(&self.inspect_command, &args).await
    }

    async fn query_history(&self, job_id: JobId) -> Result<String> {
        let args = vec![
            "-n".to_string(),
            "-P".to_string(),
            "-j".to_string(),
            job_id.to_string(),
            "--format=ExitCode".to_string(),
        ];
        self.capture(&self.accounting_command, &args).await
    }
}

/// Copies submission output to `writer` line by line, byte for byte, while
/// scanning each line for the job-id announcement. The full input reaches
/// the writer whether or not an id turns up.
async fn stream_and_extract<R, W>(mut reader: R, mut writer: W) -> Result<Option<JobId>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut job_id = None;
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&line).await?;
        writer.flush().await?;
        if job_id.is_none() {
            job_id = parse::parse_submit_line(&String::from_utf8_lossy(&line));
        }
    }
    Ok(job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_commands() {
        let client = SlurmClient::new();
        assert_eq!(client.submit_command(), "sbatch");
    }

    #[test]
    fn custom_commands() {
        let client = SlurmClient::with_commands("echo", "true", "true");
        assert_eq!(client.submit_command(), "echo");
    }

    #[tokio::test]
    async fn passthrough_is_byte_exact() {
        let input: &[u8] = b"sbatch: partition selected\nSubmitted batch job 4821\ntrailing note, no newline";
        let mut copied = Vec::new();
        let job_id = stream_and_extract(input, &mut copied).await.unwrap();
        assert_eq!(job_id, Some(4821));
        assert_eq!(copied, input);
    }

    #[tokio::test]
    async fn passthrough_without_announcement_still_copies_everything() {
        let input: &[u8] = b"sbatch: error: something went wrong\n";
        let mut copied = Vec::new();
        let job_id = stream_and_extract(input, &mut copied).await.unwrap();
        assert_eq!(job_id, None);
        assert_eq!(copied, input);
    }

    #[tokio::test]
    async fn first_announcement_wins() {
        let input: &[u8] = b"Submitted batch job 10\nSubmitted batch job 20\n";
        let mut copied = Vec::new();
        let job_id = stream_and_extract(input, &mut copied).await.unwrap();
        assert_eq!(job_id, Some(10));
    }

    #[tokio::test]
    async fn submit_extracts_id_from_echoed_output() {
        // echo stands in for sbatch and prints the announcement line.
        let client = SlurmClient::with_commands("echo", "true", "true");
        let args = vec!["Submitted batch job 77".to_string()];
        let job_id = client.submit(&args).await.expect("submit failed");
        assert_eq!(job_id, 77);
    }

    #[tokio::test]
    async fn submit_without_announcement_is_an_error() {
        let client = SlurmClient::with_commands("echo", "true", "true");
        let args = vec!["no job here".to_string()];
        let err = client.submit(&args).await.unwrap_err();
        assert!(err.is_submission_parse());
    }

    #[tokio::test]
    async fn missing_tool_is_a_spawn_error() {
        let client =
            SlurmClient::with_commands("slurmsub-test-no-such-tool", "true", "true");
        let err = client.submit(&[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Spawn { .. }));
    }
}
