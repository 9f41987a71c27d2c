//! Exit code logic for the offliner process.
//!
//! Single responsibility: map a finished run's summary to the process exit outcome.

use offliner_core::RunSummary;

use crate::ProcessExit;

/// Any failure, descriptor issue or interruption makes the run partial.
pub(crate) fn determine_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if summary.is_clean() && !summary.interrupted {
        ProcessExit::Success
    } else {
        ProcessExit::Partial
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use offliner_core::{DescriptorIssue, DownloadOutcome, OutcomeStatus, RunSummary};

    use super::determine_exit_outcome;
    use crate::ProcessExit;

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        let summary = RunSummary {
            downloaded: 6,
            absent: 2,
            ..RunSummary::default()
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_success_for_empty_run() {
        assert_eq!(
            determine_exit_outcome(&RunSummary::default()),
            ProcessExit::Success
        );
    }

    #[test]
    fn test_exit_outcome_partial_on_failure() {
        let summary = RunSummary {
            downloaded: 3,
            failures: vec![DownloadOutcome::failed(
                "org/x/a/1/a-1.jar".to_string(),
                OutcomeStatus::NotFoundAnywhere,
                Vec::new(),
                "not found in any repository",
            )],
            ..RunSummary::default()
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_partial_on_descriptor_issue() {
        let summary = RunSummary {
            descriptor_issues: vec![DescriptorIssue {
                location: PathBuf::from("deps.txt"),
                message: "bad coordinate".to_string(),
            }],
            ..RunSummary::default()
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_partial_when_interrupted() {
        let summary = RunSummary {
            interrupted: true,
            cancelled: 4,
            ..RunSummary::default()
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Partial);
    }
}
