use std::path::{Path, PathBuf};

use tokio::task::JoinError;
use tracing::{info, instrument, warn};

use super::TaskContext;
use super::attempt::{FetchResult, fetch_with_fallback};
use crate::checksum::Verification;
use crate::download::summary::{AttemptRecord, DownloadOutcome, OutcomeStatus, ResultAggregator};
use crate::target::{FetchTarget, TargetKind};

/// Fetches, verifies and records one target.
#[instrument(skip(ctx, target), fields(path = target.path(), kind = ?target.kind()))]
pub(super) async fn process_target(ctx: &TaskContext, target: FetchTarget) {
    let destination = mirror_path(&ctx.mirror_dir, target.path());

    let outcome = match fetch_with_fallback(ctx, &target, &destination).await {
        FetchResult::Served {
            repository,
            bytes,
            attempts,
        } => {
            info!(repository = %repository, bytes, "fetched");
            match target.kind() {
                TargetKind::Sidecar(_) => {
                    record_sidecar(ctx, &target, &destination, repository, attempts).await
                }
                TargetKind::Artifact | TargetKind::Descriptor => {
                    verify(ctx, &target, &destination, repository, attempts).await
                }
            }
        }
        FetchResult::Failed {
            status,
            attempts,
            message,
        } => {
            if status == OutcomeStatus::Absent {
                info!(%message, "optional file not published");
            } else {
                warn!(status = ?status, %message, "target failed");
            }
            DownloadOutcome::failed(target.path(), status, attempts, message)
        }
    };

    ctx.aggregator.record(outcome);
}

async fn record_sidecar(
    ctx: &TaskContext,
    target: &FetchTarget,
    destination: &Path,
    repository: String,
    attempts: Vec<AttemptRecord>,
) -> DownloadOutcome {
    match tokio::fs::read_to_string(destination).await {
        Ok(contents) => {
            ctx.verifier.record_sidecar(target.path(), &contents);
            DownloadOutcome::succeeded(target.path(), repository, attempts)
        }
        Err(e) => {
            warn!(error = %e, "fetched sidecar could not be read back");
            let mut outcome = DownloadOutcome::failed(
                target.path(),
                OutcomeStatus::IoError,
                attempts,
                format!("reading {}: {e}", destination.display()),
            );
            outcome.served_by = Some(repository);
            outcome
        }
    }
}

async fn verify(
    ctx: &TaskContext,
    target: &FetchTarget,
    destination: &Path,
    repository: String,
    attempts: Vec<AttemptRecord>,
) -> DownloadOutcome {
    let (status, message) = match ctx
        .verifier
        .verify_file(target.path(), target.checksums(), destination)
        .await
    {
        Ok(Verification::Verified(kinds)) => {
            if !kinds.is_empty() {
                info!(checked = ?kinds, "checksums verified");
            }
            return DownloadOutcome::succeeded(target.path(), repository, attempts);
        }
        Ok(Verification::Mismatch(mismatch)) => {
            // The file stays in the mirror for inspection.
            warn!(%mismatch, "checksum mismatch");
            (OutcomeStatus::ChecksumMismatch, mismatch.to_string())
        }
        Err(e) => (OutcomeStatus::IoError, e.to_string()),
    };

    let mut outcome = DownloadOutcome::failed(target.path(), status, attempts, message);
    outcome.served_by = Some(repository);
    outcome
}

/// Local destination for a repository-relative path.
pub(super) fn mirror_path(mirror_dir: &Path, relative_path: &str) -> PathBuf {
    relative_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(mirror_dir.to_path_buf(), |path, segment| path.join(segment))
}

pub(super) fn handle_task_join_error(
    path: &str,
    join_error: &JoinError,
    aggregator: &ResultAggregator,
) {
    warn!(path, error = %join_error, "fetch task panicked");
    aggregator.record(DownloadOutcome::failed(
        path,
        OutcomeStatus::TaskFailed,
        Vec::new(),
        format!("task panic: {join_error}"),
    ));
}
