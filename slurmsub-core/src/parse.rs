//! Line-oriented parsers for the scheduler tools' text output.
//!
//! All three external interfaces speak plain text:
//! - the submission tool announces `Submitted batch job <id>`,
//! - the controller prints `Key=Value` records, one block per task,
//! - the accounting tool prints one `<int>:<int>` exit-code pair per line.
//!
//! The parsers are tolerant by design: unrecognized lines and tokens are
//! skipped, and a malformed field never fails the whole query.

use crate::domain::job::{ExitCode, JobId};
use crate::domain::snapshot::{PollSnapshot, TaskStatus};

const SUBMIT_PREFIX: &str = "Submitted batch job ";
const UNKNOWN_JOB_MARKER: &str = "invalid job id";

/// Extracts a job id from one line of submission output.
///
/// Matches `Submitted batch job <digits>` with optional trailing text
/// (some clusters append `on cluster <name>`). Returns `None` for anything
/// else, including a zero id.
pub fn parse_submit_line(line: &str) -> Option<JobId> {
    let rest = line.trim().strip_prefix(SUBMIT_PREFIX)?;
    let token = rest.split_whitespace().next()?;
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: JobId = token.parse().ok()?;
    (id > 0).then_some(id)
}

/// Result of parsing one controller query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    /// The controller does not recognize the job id.
    UnknownJob,
    /// Whatever task records the controller reported, possibly none.
    Snapshot(PollSnapshot),
}

/// Parses the controller's `show job` output into task records.
///
/// Each `JobState=` token starts a new record; an `ExitCode=` token attaches
/// to the record it belongs to. Fields must be correlated per task, never
/// across the whole output: with array jobs the controller prints one block
/// per task, separated by blank lines, and a block may spread its fields
/// over several lines.
pub fn parse_inspection(output: &str) -> Inspection {
    if output.to_ascii_lowercase().contains(UNKNOWN_JOB_MARKER) {
        return Inspection::UnknownJob;
    }

    let mut tasks = Vec::new();
    let mut current: Option<TaskStatus> = None;
    for line in output.lines() {
        if line.trim().is_empty() {
            // blank line ends the current record block
            if let Some(task) = current.take() {
                tasks.push(task);
            }
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(value) = token.strip_prefix("JobState=") {
                if let Some(task) = current.take() {
                    tasks.push(task);
                }
                current = Some(TaskStatus {
                    state: value.into(),
                    exit_code: None,
                });
            } else if let Some(value) = token.strip_prefix("ExitCode=") {
                if let Some(task) = current.as_mut() {
                    if task.exit_code.is_none() {
                        task.exit_code = ExitCode::parse(value);
                    }
                }
            }
        }
    }
    if let Some(task) = current {
        tasks.push(task);
    }

    Inspection::Snapshot(PollSnapshot::new(tasks))
}

/// Parses accounting output into deduplicated exit-code pairs.
///
/// Takes the first `<int>:<int>` token on each line; order of first
/// appearance is preserved.
pub fn parse_accounting(output: &str) -> Vec<ExitCode> {
    let mut codes = Vec::new();
    for line in output.lines() {
        let pair = line
            .split(|c: char| c.is_whitespace() || c == '|')
            .find_map(ExitCode::parse);
        if let Some(code) = pair {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}
