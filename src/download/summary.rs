//! Result aggregation for a mirror run.
//!
//! [`ResultAggregator`] is created by the caller, shared with every scheduler
//! task through an `Arc`, and turned into a [`RunSummary`] once the pool has
//! drained. Each target is recorded exactly once.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

/// Terminal status of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Fetched and, where sidecars were available, verified.
    Succeeded,
    /// Optional target (descriptor or sidecar) not published by any candidate.
    Absent,
    /// Required target not served by any candidate.
    NotFoundAnywhere,
    /// Bytes were written but disagree with a fetched sidecar.
    ChecksumMismatch,
    /// The last candidate failed at the transport level after all retries.
    TransportError,
    /// The local mirror could not be written.
    IoError,
    /// The worker task for this target panicked or was cancelled.
    TaskFailed,
}

impl OutcomeStatus {
    /// Whether this status belongs in the failure list.
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Succeeded | Self::Absent)
    }

    /// Stable label, identical to the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Absent => "absent",
            Self::NotFoundAnywhere => "not-found-anywhere",
            Self::ChecksumMismatch => "checksum-mismatch",
            Self::TransportError => "transport-error",
            Self::IoError => "io-error",
            Self::TaskFailed => "task-failed",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed attempt against one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub repository: String,
    pub attempt: u32,
    pub reason: String,
}

/// Final result for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    /// Repository-relative path of the target.
    pub path: String,
    pub status: OutcomeStatus,
    /// Id of the repository that served the file, if any.
    pub served_by: Option<String>,
    /// Failed attempts leading up to the outcome, in order.
    pub attempts: Vec<AttemptRecord>,
    pub message: Option<String>,
}

impl DownloadOutcome {
    #[must_use]
    pub fn succeeded(
        path: impl Into<String>,
        served_by: impl Into<String>,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            path: path.into(),
            status: OutcomeStatus::Succeeded,
            served_by: Some(served_by.into()),
            attempts,
            message: None,
        }
    }

    #[must_use]
    pub fn failed(
        path: impl Into<String>,
        status: OutcomeStatus,
        attempts: Vec<AttemptRecord>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            status,
            served_by: None,
            attempts,
            message: Some(message.into()),
        }
    }

    /// Repositories tried, in order, without repeats.
    #[must_use]
    pub fn repositories_attempted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for record in &self.attempts {
            if !ids.contains(&record.repository.as_str()) {
                ids.push(&record.repository);
            }
        }
        if let Some(served) = self.served_by.as_deref()
            && !ids.contains(&served)
        {
            ids.push(served);
        }
        ids
    }
}

/// An input location that could not be used, fully or partly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorIssue {
    pub location: PathBuf,
    pub message: String,
}

/// Everything the caller learns about a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Files fetched and verified.
    pub downloaded: usize,
    /// Retry attempts made across all targets.
    pub retried: usize,
    /// Optional targets no repository published.
    pub absent: usize,
    /// Targets never started because the run was interrupted.
    pub cancelled: usize,
    pub interrupted: bool,
    /// Failure outcomes in completion order.
    pub failures: Vec<DownloadOutcome>,
    /// Successful outcomes in completion order.
    pub successes: Vec<DownloadOutcome>,
    pub descriptor_issues: Vec<DescriptorIssue>,
}

impl RunSummary {
    /// True when no target failed and every input was usable.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.descriptor_issues.is_empty()
    }

    /// Finds the outcome recorded for `path`, failure or success.
    #[must_use]
    pub fn outcome(&self, path: &str) -> Option<&DownloadOutcome> {
        self.failures
            .iter()
            .chain(&self.successes)
            .find(|outcome| outcome.path == path)
    }

    /// Failures with the given status.
    pub fn failures_with(&self, status: OutcomeStatus) -> impl Iterator<Item = &DownloadOutcome> {
        self.failures
            .iter()
            .filter(move |outcome| outcome.status == status)
    }
}

/// Thread-safe collector shared by scheduler tasks.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    downloaded: AtomicUsize,
    retried: AtomicUsize,
    absent: AtomicUsize,
    cancelled: AtomicUsize,
    processed: AtomicUsize,
    interrupted: AtomicBool,
    failures: Mutex<Vec<DownloadOutcome>>,
    successes: Mutex<Vec<DownloadOutcome>>,
    descriptor_issues: Mutex<Vec<DescriptorIssue>>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the terminal outcome of one target.
    pub fn record(&self, outcome: DownloadOutcome) {
        debug!(path = %outcome.path, status = ?outcome.status, "recording outcome");
        match outcome.status {
            OutcomeStatus::Succeeded => {
                self.downloaded.fetch_add(1, Ordering::SeqCst);
                self.successes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(outcome);
            }
            OutcomeStatus::Absent => {
                self.absent.fetch_add(1, Ordering::SeqCst);
            }
            _ => {
                self.failures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(outcome);
            }
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_descriptor_issue(&self, issue: DescriptorIssue) {
        self.descriptor_issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(issue);
    }

    pub fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    /// Counts targets that were dropped from the queue on interrupt.
    pub fn add_cancelled(&self, count: usize) {
        self.cancelled.fetch_add(count, Ordering::SeqCst);
    }

    pub fn set_interrupted(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Targets with a recorded outcome so far. Used for progress reporting.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            downloaded: self.downloaded(),
            retried: self.retried.load(Ordering::SeqCst),
            absent: self.absent.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            interrupted: self.was_interrupted(),
            failures: self
                .failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            successes: self
                .successes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            descriptor_issues: self
                .descriptor_issues
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
