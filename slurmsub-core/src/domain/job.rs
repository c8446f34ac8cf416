//! Job domain types

/// Scheduler-assigned job identifier.
///
/// Extracted once from the submission output and used as the key for every
/// subsequent query. SLURM ids are positive integers.
pub type JobId = u64;

/// State of a single task as reported by the controller.
///
/// A job may fan out into many array tasks; each one carries its own state.
/// States outside the known vocabulary are preserved verbatim in `Other` so
/// they still count as observed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Configuring,
    Completing,
    Pending,
    Running,
    Suspended,
    Stopped,
    BootFail,
    Cancelled,
    Failed,
    NodeFail,
    Preempted,
    Timeout,
    Completed,
    Other(String),
}

impl TaskState {
    /// The scheduler may still transition this task; keep polling.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Configuring
                | Self::Completing
                | Self::Pending
                | Self::Running
                | Self::Suspended
                | Self::Stopped
        )
    }

    /// Terminal state that counts as a failure contributor.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::BootFail
                | Self::Cancelled
                | Self::Failed
                | Self::NodeFail
                | Self::Preempted
                | Self::Timeout
        )
    }
}

impl From<&str> for TaskState {
    fn from(keyword: &str) -> Self {
        match keyword {
            "CONFIGURING" => Self::Configuring,
            "COMPLETING" => Self::Completing,
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUSPENDED" => Self::Suspended,
            "STOPPED" => Self::Stopped,
            "BOOT_FAIL" => Self::BootFail,
            "CANCELLED" => Self::Cancelled,
            "FAILED" => Self::Failed,
            "NODE_FAIL" => Self::NodeFail,
            "PREEMPTED" => Self::Preempted,
            "TIMEOUT" => Self::Timeout,
            "COMPLETED" => Self::Completed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Exit code pair reported by the scheduler: program return code and
/// terminating signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitCode {
    pub code: u32,
    pub signal: u32,
}

impl ExitCode {
    /// The clean `0:0` pair.
    pub const CLEAN: ExitCode = ExitCode { code: 0, signal: 0 };

    /// Parses an `<int>:<int>` pair, e.g. `0:0` or `2:15`.
    pub fn parse(token: &str) -> Option<Self> {
        let (code, signal) = token.split_once(':')?;
        Some(ExitCode {
            code: code.parse().ok()?,
            signal: signal.parse().ok()?,
        })
    }

    /// The worse of the two components, compared numerically.
    pub fn worst(&self) -> u32 {
        self.code.max(self.signal)
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.code, self.signal)
    }
}
