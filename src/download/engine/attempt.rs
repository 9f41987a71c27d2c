//! Per-target candidate/retry state machine.
//!
//! ```text
//! Pending -> Trying(candidate, attempt) -> Succeeded
//!                                       -> Retry(candidate, attempt + 1, delay) -> Trying
//!                                       -> NextCandidate -> Trying | Exhausted
//!                                       -> Aborted (local write failure)
//! ```
//!
//! A candidate's retries are exhausted before the next candidate is tried.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::TaskContext;
use crate::download::client::partial_path;
use crate::download::retry::{FailureType, RetryDecision, classify_error};
use crate::download::summary::{AttemptRecord, OutcomeStatus};
use crate::download::DownloadError;
use crate::repository::RepositoryLocation;
use crate::target::FetchTarget;

#[derive(Debug)]
enum AttemptState<'a> {
    Pending,
    Trying {
        candidate: &'a RepositoryLocation,
        attempt: u32,
    },
    Retry {
        candidate: &'a RepositoryLocation,
        attempt: u32,
        delay: Duration,
    },
    NextCandidate,
    Succeeded {
        candidate: &'a RepositoryLocation,
        bytes: u64,
    },
    Exhausted,
    Aborted {
        error: DownloadError,
    },
}

/// How fetching one target ended, before checksum verification.
#[derive(Debug)]
pub(super) enum FetchResult {
    Served {
        repository: String,
        bytes: u64,
        attempts: Vec<AttemptRecord>,
    },
    Failed {
        status: OutcomeStatus,
        attempts: Vec<AttemptRecord>,
        message: String,
    },
}

/// Drives `target` through its candidates until one serves it or none is left.
pub(super) async fn fetch_with_fallback(
    ctx: &TaskContext,
    target: &FetchTarget,
    destination: &Path,
) -> FetchResult {
    let mut candidates = ctx.resolver.candidates(target.repositories());
    let mut trail: Vec<AttemptRecord> = Vec::new();
    let mut last_failure: Option<FailureType> = None;
    let mut last_message: Option<String> = None;
    let mut state = AttemptState::Pending;

    loop {
        state = match state {
            AttemptState::Pending | AttemptState::NextCandidate => match candidates.next() {
                Some(candidate) => AttemptState::Trying {
                    candidate,
                    attempt: 1,
                },
                None => AttemptState::Exhausted,
            },

            AttemptState::Trying { candidate, attempt } => {
                debug!(
                    path = target.path(),
                    repository = candidate.id(),
                    attempt,
                    "attempting fetch"
                );
                match fetch_once(ctx, candidate, target.path(), destination).await {
                    Ok(bytes) => AttemptState::Succeeded { candidate, bytes },
                    Err(error) => {
                        let failure = classify_error(&error);
                        trail.push(AttemptRecord {
                            repository: candidate.id().to_string(),
                            attempt,
                            reason: error.to_string(),
                        });
                        last_failure = Some(failure);
                        last_message = Some(error.to_string());

                        if failure == FailureType::Local {
                            AttemptState::Aborted { error }
                        } else {
                            match ctx.retry_policy.should_retry(failure, attempt) {
                                RetryDecision::Retry {
                                    delay,
                                    attempt: next_attempt,
                                } => {
                                    info!(
                                        path = target.path(),
                                        repository = candidate.id(),
                                        attempt = next_attempt,
                                        max_attempts = ctx.retry_policy.max_attempts(),
                                        delay_ms = delay.as_millis(),
                                        error = %error,
                                        "retrying fetch"
                                    );
                                    ctx.aggregator.increment_retried();
                                    AttemptState::Retry {
                                        candidate,
                                        attempt: next_attempt,
                                        delay,
                                    }
                                }
                                RetryDecision::DoNotRetry { reason } => {
                                    debug!(
                                        path = target.path(),
                                        repository = candidate.id(),
                                        %reason,
                                        "advancing to next candidate"
                                    );
                                    AttemptState::NextCandidate
                                }
                            }
                        }
                    }
                }
            }

            AttemptState::Retry {
                candidate,
                attempt,
                delay,
            } => {
                tokio::time::sleep(delay).await;
                AttemptState::Trying { candidate, attempt }
            }

            AttemptState::Succeeded { candidate, bytes } => {
                return FetchResult::Served {
                    repository: candidate.id().to_string(),
                    bytes,
                    attempts: trail,
                };
            }

            AttemptState::Exhausted => {
                return exhausted(target, last_failure, last_message, trail);
            }

            AttemptState::Aborted { error } => {
                warn!(path = target.path(), error = %error, "local write failed");
                return FetchResult::Failed {
                    status: OutcomeStatus::IoError,
                    attempts: trail,
                    message: error.to_string(),
                };
            }
        };
    }
}

/// One GET against one candidate, bounded by the per-attempt timeout.
async fn fetch_once(
    ctx: &TaskContext,
    candidate: &RepositoryLocation,
    path: &str,
    destination: &Path,
) -> Result<u64, DownloadError> {
    let url = candidate.url_for(path)?;
    match tokio::time::timeout(
        ctx.attempt_timeout,
        ctx.fetcher.fetch_to_file(&url, destination),
    )
    .await
    {
        Ok(result) => result,
        Err(_elapsed) => {
            // The fetch future was dropped mid-write.
            let _ = tokio::fs::remove_file(partial_path(destination)).await;
            Err(DownloadError::timeout(url.as_str()))
        }
    }
}

fn exhausted(
    target: &FetchTarget,
    last_failure: Option<FailureType>,
    last_message: Option<String>,
    attempts: Vec<AttemptRecord>,
) -> FetchResult {
    let status = match last_failure {
        Some(FailureType::Transient) => OutcomeStatus::TransportError,
        _ if target.is_required() => OutcomeStatus::NotFoundAnywhere,
        _ => OutcomeStatus::Absent,
    };
    let message = match (status, last_message) {
        (OutcomeStatus::TransportError, Some(message)) => message,
        (_, _) if attempts.is_empty() => "no candidate repositories".to_string(),
        _ => format!(
            "not found in any of {} candidate repositories",
            count_repositories(&attempts)
        ),
    };
    FetchResult::Failed {
        status,
        attempts,
        message,
    }
}

fn count_repositories(attempts: &[AttemptRecord]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for record in attempts {
        if !seen.contains(&record.repository.as_str()) {
            seen.push(&record.repository);
        }
    }
    seen.len()
}
