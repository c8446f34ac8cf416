//! Poll snapshots
//!
//! One `PollSnapshot` is produced per poll cycle and replaces the previous
//! one entirely; only the snapshot that ends the watch loop is kept, to
//! derive the aggregate exit status from.

use crate::domain::job::{ExitCode, TaskState};

/// One observed task record from a poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    pub exit_code: Option<ExitCode>,
}

/// All task records observed in one query of the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    tasks: Vec<TaskStatus>,
}

impl PollSnapshot {
    pub fn new(tasks: Vec<TaskStatus>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskStatus] {
        &self.tasks
    }

    /// Number of well-formed records observed.
    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    /// Tasks the scheduler may still transition.
    pub fn running(&self) -> usize {
        self.tasks.iter().filter(|t| t.state.is_active()).count()
    }

    /// Tasks in a terminal failure state.
    pub fn failed(&self) -> usize {
        self.tasks.iter().filter(|t| t.state.is_failure()).count()
    }

    /// True only when at least one record was observed and none of them can
    /// still change. Success must never be reported from anything less.
    pub fn all_terminal(&self) -> bool {
        self.total() > 0 && self.running() == 0
    }

    pub fn any_failed(&self) -> bool {
        self.failed() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(state: &str, exit_code: Option<&str>) -> TaskStatus {
        TaskStatus {
            state: state.into(),
            exit_code: exit_code.map(|c| ExitCode::parse(c).unwrap()),
        }
    }

    #[test]
    fn counts_over_mixed_states() {
        let snapshot = PollSnapshot::new(vec![
            task("RUNNING", None),
            task("COMPLETED", Some("0:0")),
            task("FAILED", Some("1:0")),
            task("DEADLINE", None),
        ]);
        assert_eq!(snapshot.total(), 4);
        assert_eq!(snapshot.running(), 1);
        assert_eq!(snapshot.failed(), 1);
        assert!(!snapshot.all_terminal());
        assert!(snapshot.any_failed());
    }

    #[test]
    fn empty_snapshot_is_not_terminal() {
        let snapshot = PollSnapshot::default();
        assert_eq!(snapshot.total(), 0);
        assert!(!snapshot.all_terminal());
    }

    #[test]
    fn unknown_states_count_toward_total_only() {
        let snapshot = PollSnapshot::new(vec![task("DEADLINE", None), task("REVOKED", None)]);
        assert_eq!(snapshot.total(), 2);
        assert_eq!(snapshot.running(), 0);
        assert_eq!(snapshot.failed(), 0);
        assert!(snapshot.all_terminal());
        assert!(!snapshot.any_failed());
    }
}
