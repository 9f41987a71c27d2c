//! Run orchestration: inputs in, populated mirror and [`RunSummary`] out.
//!
//! A run is fatal only before scheduling starts: the mirror directory cannot
//! be created, no input was given, or none of the inputs could be read.
//! Everything after that is a per-target outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::checksum::{ChecksumKind, DEFAULT_CHECKSUM_KINDS};
use crate::descriptor::DescriptorReaders;
use crate::download::{
    DEFAULT_CONCURRENCY, DescriptorIssue, DownloadScheduler, EngineError, Fetcher,
    READ_TIMEOUT_SECS, ResultAggregator, RetryPolicy, RunSummary,
};
use crate::repository::RepositoryLocation;
use crate::target::{TargetSet, TargetSetBuilder};

/// Errors that abort a run before any target is scheduled.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot create mirror directory {path}: {source}")]
    MirrorDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no input locations given")]
    NoInputs,

    /// Every input location failed to load.
    #[error("none of the {count} input locations could be read")]
    NoUsableInputs { count: usize, issues: Vec<DescriptorIssue> },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Everything a run needs besides the transport.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the local mirror tree; created if absent.
    pub mirror_dir: PathBuf,
    /// Descriptor or coordinate-list files.
    pub locations: Vec<PathBuf>,
    pub concurrency: usize,
    pub retry_policy: RetryPolicy,
    /// Bound on one GET attempt including the body.
    pub attempt_timeout: Duration,
    /// Tried after every descriptor-declared repository.
    pub default_repositories: Vec<RepositoryLocation>,
    pub checksum_kinds: Vec<ChecksumKind>,
}

impl RunConfig {
    /// Config with built-in defaults for everything but the paths.
    #[must_use]
    pub fn new(mirror_dir: impl Into<PathBuf>, locations: Vec<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            locations,
            concurrency: DEFAULT_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            default_repositories: Vec::new(),
            checksum_kinds: DEFAULT_CHECKSUM_KINDS.to_vec(),
        }
    }
}

/// Targets planned from the inputs, before any network access.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub targets: TargetSet,
    /// Unreadable inputs and malformed dependencies.
    pub descriptor_issues: Vec<DescriptorIssue>,
    /// Inputs that loaded successfully.
    pub descriptors_loaded: usize,
}

/// Loads every input and expands it into a deduplicated target set.
///
/// # Errors
///
/// Returns [`RunError::NoInputs`] for an empty location list and
/// [`RunError::NoUsableInputs`] when no location could be loaded.
#[instrument(skip(config, readers), fields(locations = config.locations.len()))]
pub async fn plan(config: &RunConfig, readers: &DescriptorReaders) -> Result<RunPlan, RunError> {
    if config.locations.is_empty() {
        return Err(RunError::NoInputs);
    }

    let mut builder = TargetSetBuilder::new(
        config.checksum_kinds.clone(),
        config.default_repositories.clone(),
    );
    let mut issues = Vec::new();
    let mut loaded = 0usize;

    for location in &config.locations {
        match readers.load(location).await {
            Ok(descriptor) => {
                for invalid in &descriptor.invalid {
                    warn!(location = %location.display(), error = %invalid, "skipping dependency");
                    issues.push(DescriptorIssue {
                        location: location.clone(),
                        message: invalid.to_string(),
                    });
                }
                builder.add_descriptor(&descriptor);
                loaded += 1;
            }
            Err(e) => {
                warn!(location = %location.display(), error = %e, "skipping input");
                issues.push(DescriptorIssue {
                    location: location.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    if loaded == 0 {
        return Err(RunError::NoUsableInputs {
            count: config.locations.len(),
            issues,
        });
    }

    let targets = builder.build();
    info!(
        descriptors = loaded,
        targets = targets.len(),
        issues = issues.len(),
        "planned run"
    );
    Ok(RunPlan {
        targets,
        descriptor_issues: issues,
        descriptors_loaded: loaded,
    })
}

/// Runs with the built-in descriptor readers.
///
/// # Errors
///
/// See [`run_with_readers`].
pub async fn run(
    config: &RunConfig,
    fetcher: Arc<dyn Fetcher>,
    aggregator: &Arc<ResultAggregator>,
    interrupted: Arc<AtomicBool>,
) -> Result<RunSummary, RunError> {
    run_with_readers(
        config,
        &DescriptorReaders::default(),
        fetcher,
        aggregator,
        interrupted,
    )
    .await
}

/// Plans the targets, then executes the plan.
///
/// Per-target failures and descriptor issues end up in the returned summary.
///
/// # Errors
///
/// Returns [`RunError`] only for failures that prevent scheduling.
#[instrument(skip_all, fields(mirror_dir = %config.mirror_dir.display()))]
pub async fn run_with_readers(
    config: &RunConfig,
    readers: &DescriptorReaders,
    fetcher: Arc<dyn Fetcher>,
    aggregator: &Arc<ResultAggregator>,
    interrupted: Arc<AtomicBool>,
) -> Result<RunSummary, RunError> {
    let plan = plan(config, readers).await?;
    execute(config, plan, fetcher, aggregator, interrupted).await
}

/// Prepares the mirror directory and schedules an already planned run.
///
/// # Errors
///
/// Returns [`RunError::MirrorDirectory`] when the mirror cannot be created
/// and [`RunError::Engine`] for an invalid scheduler configuration.
pub async fn execute(
    config: &RunConfig,
    plan: RunPlan,
    fetcher: Arc<dyn Fetcher>,
    aggregator: &Arc<ResultAggregator>,
    interrupted: Arc<AtomicBool>,
) -> Result<RunSummary, RunError> {
    let scheduler = DownloadScheduler::new(
        config.concurrency,
        config.retry_policy.clone(),
        config.attempt_timeout,
    )?;

    tokio::fs::create_dir_all(&config.mirror_dir)
        .await
        .map_err(|source| RunError::MirrorDirectory {
            path: config.mirror_dir.clone(),
            source,
        })?;

    for issue in plan.descriptor_issues {
        aggregator.record_descriptor_issue(issue);
    }

    scheduler
        .run(
            plan.targets,
            fetcher,
            &config.mirror_dir,
            aggregator,
            interrupted,
        )
        .await?;

    Ok(aggregator.summary())
}
