//! Final exit status derivation
//!
//! The process exit code is the one externally observable result of a
//! submit-and-watch run, so its derivation is deliberately small and pure.

use crate::domain::job::ExitCode;
use crate::domain::snapshot::PollSnapshot;

/// The submission tool never printed a usable job id.
pub const EXIT_SUBMIT_FAILED: u8 = 3;

/// A task ended in a failure state but every reported exit code was zero.
/// The numeric codes alone cannot be trusted as the success signal, so a
/// clean zero is overridden rather than silently reported.
pub const EXIT_FAILED_NO_EVIDENCE: u8 = 99;

/// The accounting fallback found anything other than a single clean pair.
pub const EXIT_HISTORY_UNCLEAN: u8 = 1;

/// Derives the process exit status from the terminal snapshot.
///
/// Takes the numerically largest component across every task's exit-code
/// pair. When the scheduler reports a failure state without any nonzero
/// code to back it up, the result is forced to
/// [`EXIT_FAILED_NO_EVIDENCE`].
pub fn aggregate(snapshot: &PollSnapshot) -> u8 {
    let highest = snapshot
        .tasks()
        .iter()
        .filter_map(|task| task.exit_code)
        .map(|code| code.worst())
        .max()
        .unwrap_or(0);

    if snapshot.any_failed() && highest == 0 {
        return EXIT_FAILED_NO_EVIDENCE;
    }
    highest.min(u8::MAX as u32) as u8
}

/// Decides the outcome from deduplicated accounting exit codes.
///
/// Used when the controller no longer knows the job: success only when the
/// recorded history is exactly one clean `0:0` pair.
pub fn resolve_history(codes: &[ExitCode]) -> u8 {
    match codes {
        [code] if *code == ExitCode::CLEAN => 0,
        _ => EXIT_HISTORY_UNCLEAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::TaskStatus;

    fn task(state: &str, exit_code: Option<&str>) -> TaskStatus {
        TaskStatus {
            state: state.into(),
            exit_code: exit_code.map(|c| ExitCode::parse(c).unwrap()),
        }
    }

    #[test]
    fn clean_completion_aggregates_to_zero() {
        let snapshot = PollSnapshot::new(vec![task("COMPLETED", Some("0:0"))]);
        assert_eq!(aggregate(&snapshot), 0);
    }

    #[test]
    fn highest_component_across_tasks_wins() {
        let snapshot = PollSnapshot::new(vec![
            task("COMPLETED", Some("2:0")),
            task("COMPLETED", Some("0:5")),
        ]);
        assert_eq!(aggregate(&snapshot), 5);
    }

    #[test]
    fn comparison_is_numeric_not_lexical() {
        // "9" > "17" lexically; 17 must win here.
        let snapshot = PollSnapshot::new(vec![
            task("FAILED", Some("9:0")),
            task("FAILED", Some("17:0")),
        ]);
        assert_eq!(aggregate(&snapshot), 17);
    }

    #[test]
    fn failure_without_evidence_is_overridden() {
        let snapshot = PollSnapshot::new(vec![
            task("FAILED", Some("0:0")),
            task("COMPLETED", Some("0:0")),
        ]);
        assert_eq!(aggregate(&snapshot), EXIT_FAILED_NO_EVIDENCE);
    }

    #[test]
    fn failure_with_evidence_keeps_the_code() {
        let snapshot = PollSnapshot::new(vec![task("FAILED", Some("2:0"))]);
        assert_eq!(aggregate(&snapshot), 2);
    }

    #[test]
    fn missing_exit_codes_count_as_zero() {
        let snapshot = PollSnapshot::new(vec![task("COMPLETED", None)]);
        assert_eq!(aggregate(&snapshot), 0);
    }

    #[test]
    fn oversized_codes_are_clamped() {
        let snapshot = PollSnapshot::new(vec![task("FAILED", Some("300:0"))]);
        assert_eq!(aggregate(&snapshot), 255);
    }

    #[test]
    fn history_single_clean_pair_is_success() {
        assert_eq!(resolve_history(&[ExitCode::CLEAN]), 0);
    }

    #[test]
    fn history_anything_else_is_failure() {
        assert_eq!(
            resolve_history(&[ExitCode { code: 1, signal: 0 }]),
            EXIT_HISTORY_UNCLEAN
        );
        assert_eq!(
            resolve_history(&[ExitCode::CLEAN, ExitCode { code: 1, signal: 0 }]),
            EXIT_HISTORY_UNCLEAN
        );
        assert_eq!(resolve_history(&[]), EXIT_HISTORY_UNCLEAN);
    }
}
