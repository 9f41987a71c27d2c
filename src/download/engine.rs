//! Download scheduler: bounded-parallel execution of a [`TargetSet`].
//!
//! # Overview
//!
//! The scheduler runs two phases over the same semaphore-bounded pool:
//! checksum sidecars first, then artifacts and descriptors. Every primary
//! file is therefore verified against every sidecar fetched in the run.
//!
//! Each target runs in its own Tokio task. Failures are converted into
//! outcomes on the shared [`ResultAggregator`] and never stop other targets.
//!
//! # Example
//!
//! ```no_run
//! use offliner_core::download::{DownloadScheduler, HttpClient, ResultAggregator, RetryPolicy};
//! use offliner_core::target::TargetSetBuilder;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let targets = TargetSetBuilder::default().build();
//! let scheduler = DownloadScheduler::new(10, RetryPolicy::default(), Duration::from_secs(300))?;
//! let aggregator = Arc::new(ResultAggregator::new());
//! scheduler
//!     .run(
//!         targets,
//!         Arc::new(HttpClient::new()),
//!         Path::new("./mirror"),
//!         &aggregator,
//!         Arc::new(AtomicBool::new(false)),
//!     )
//!     .await?;
//! let summary = aggregator.summary();
//! println!("Downloaded: {}, Failed: {}", summary.downloaded, summary.failures.len());
//! # Ok(())
//! # }
//! ```

mod attempt;
mod task;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::client::Fetcher;
use super::retry::RetryPolicy;
use super::summary::ResultAggregator;
use crate::checksum::ChecksumVerifier;
use crate::repository::RepositoryResolver;
use crate::target::{FetchTarget, TargetSet};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// How often a permit wait re-checks the interrupt flag.
const INTERRUPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error type for download scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// State shared by every task of one run.
#[derive(Debug)]
struct TaskContext {
    fetcher: Arc<dyn Fetcher>,
    mirror_dir: PathBuf,
    retry_policy: RetryPolicy,
    attempt_timeout: Duration,
    resolver: Arc<RepositoryResolver>,
    verifier: ChecksumVerifier,
    aggregator: Arc<ResultAggregator>,
}

/// Concurrent target executor with per-candidate retry and fallback.
///
/// # Concurrency Model
///
/// - Each target runs in its own Tokio task
/// - A semaphore permit is acquired before starting each target
/// - Permits are released automatically when targets complete (RAII)
/// - On interrupt, no new targets start; in-flight ones run to completion
#[derive(Debug)]
pub struct DownloadScheduler {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    retry_policy: RetryPolicy,
    attempt_timeout: Duration,
    resolver: Arc<RepositoryResolver>,
}

impl DownloadScheduler {
    /// Creates a scheduler.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of targets in flight (1-100)
    /// * `retry_policy` - Retry policy applied per repository candidate
    /// * `attempt_timeout` - Upper bound on a single GET including the body
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use offliner_core::download::{DownloadScheduler, RetryPolicy};
    ///
    /// let scheduler = DownloadScheduler::new(10, RetryPolicy::default(), Duration::from_secs(60)).unwrap();
    /// assert_eq!(scheduler.concurrency(), 10);
    /// ```
    #[instrument(level = "debug", skip(retry_policy))]
    pub fn new(
        concurrency: usize,
        retry_policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            attempt_timeout_secs = attempt_timeout.as_secs(),
            "creating download scheduler"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            retry_policy,
            attempt_timeout,
            resolver: Arc::new(RepositoryResolver::new()),
        })
    }

    /// Replaces the repository resolver (e.g. one with blocked locations).
    #[must_use]
    pub fn with_resolver(mut self, resolver: RepositoryResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Executes every target, recording one outcome per target on `aggregator`.
    ///
    /// When `interrupted` becomes `true`, the scheduler:
    /// - stops starting new targets
    /// - lets in-flight targets finish
    /// - counts never-started targets as cancelled
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    ///
    /// Individual target failures do NOT cause this method to error.
    #[instrument(skip(self, targets, fetcher, aggregator, interrupted), fields(mirror_dir = %mirror_dir.display(), targets = targets.len()))]
    pub async fn run(
        &self,
        targets: TargetSet,
        fetcher: Arc<dyn Fetcher>,
        mirror_dir: &Path,
        aggregator: &Arc<ResultAggregator>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<(), EngineError> {
        let ctx = Arc::new(TaskContext {
            fetcher,
            mirror_dir: mirror_dir.to_path_buf(),
            retry_policy: self.retry_policy.clone(),
            attempt_timeout: self.attempt_timeout,
            resolver: Arc::clone(&self.resolver),
            verifier: ChecksumVerifier::new(),
            aggregator: Arc::clone(aggregator),
        });

        let (sidecars, primaries) = targets.into_phases();
        info!(
            sidecars = sidecars.len(),
            files = primaries.len(),
            "starting mirror run"
        );

        let skipped = self.run_phase("sidecars", sidecars, &ctx, &interrupted).await?;
        let skipped = if skipped == 0 && !interrupted.load(Ordering::SeqCst) {
            debug!(recorded = ctx.verifier.len(), "sidecar phase complete");
            self.run_phase("files", primaries, &ctx, &interrupted).await?
        } else {
            skipped + primaries.len()
        };

        if interrupted.load(Ordering::SeqCst) {
            aggregator.set_interrupted();
        }
        if skipped > 0 {
            warn!(cancelled = skipped, "run interrupted before all targets started");
            aggregator.add_cancelled(skipped);
        }

        info!(
            downloaded = aggregator.downloaded(),
            failed = aggregator.failed(),
            cancelled = skipped,
            "mirror run complete"
        );
        Ok(())
    }

    /// Runs one phase to completion. Returns the number of targets never started.
    async fn run_phase(
        &self,
        phase: &'static str,
        targets: Vec<FetchTarget>,
        ctx: &Arc<TaskContext>,
        interrupted: &Arc<AtomicBool>,
    ) -> Result<usize, EngineError> {
        let mut queue: VecDeque<FetchTarget> = targets.into();
        let mut handles: Vec<(String, JoinHandle<()>)> = Vec::new();

        debug!(phase, queued = queue.len(), "starting phase");

        while let Some(target) = queue.pop_front() {
            if interrupted.load(Ordering::SeqCst) {
                queue.push_front(target);
                break;
            }
            drain_finished_tasks(&mut handles, &ctx.aggregator).await;

            // Race the permit against the interrupt flag so Ctrl+C during a
            // full-concurrency wait stops dequeuing immediately.
            let permit = tokio::select! {
                biased;
                () = wait_for_interrupt(interrupted) => None,
                result = self.semaphore.clone().acquire_owned() => {
                    Some(result.map_err(|_| EngineError::SemaphoreClosed)?)
                }
            };
            let Some(permit) = permit else {
                queue.push_front(target);
                break;
            };

            let ctx = Arc::clone(ctx);
            let path = target.path().to_string();
            handles.push((
                path,
                tokio::spawn(async move {
                    let _permit = permit;
                    task::process_target(&ctx, target).await;
                }),
            ));
        }

        debug!(phase, in_flight = handles.len(), "waiting for phase to drain");

        for (path, handle) in handles {
            if let Err(e) = handle.await {
                task::handle_task_join_error(&path, &e, &ctx.aggregator);
            }
        }

        Ok(queue.len())
    }
}

async fn wait_for_interrupt(interrupted: &AtomicBool) {
    while !interrupted.load(Ordering::SeqCst) {
        tokio::time::sleep(INTERRUPT_POLL_INTERVAL).await;
    }
}

async fn drain_finished_tasks(
    handles: &mut Vec<(String, JoinHandle<()>)>,
    aggregator: &ResultAggregator,
) {
    let mut idx = 0;
    while idx < handles.len() {
        if handles[idx].1.is_finished() {
            let (path, handle) = handles.swap_remove(idx);
            if let Err(e) = handle.await {
                task::handle_task_join_error(&path, &e, aggregator);
            }
        } else {
            idx += 1;
        }
    }
}
