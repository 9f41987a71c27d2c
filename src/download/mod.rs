//! Concurrent mirror download engine.
//!
//! This module fetches every [`FetchTarget`](crate::target::FetchTarget) of a
//! run into the local mirror, with retry, repository fallback and checksum
//! verification.
//!
//! # Features
//!
//! - Streaming downloads through a `.part` file renamed on completion
//! - Bounded parallelism (1-100 workers, 10 by default)
//! - Exponential backoff with jitter for transient failures only
//! - Per-target failure isolation; every target ends as one outcome
//! - Thread-safe result aggregation into a serializable [`RunSummary`]

mod client;
mod constants;
mod engine;
mod error;
mod retry;
mod summary;

pub use client::{Fetcher, HttpClient, partial_path};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use engine::{
    DEFAULT_CONCURRENCY, DownloadScheduler, EngineError, MAX_CONCURRENCY, MIN_CONCURRENCY,
};
pub use error::DownloadError;
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};
pub use summary::{
    AttemptRecord, DescriptorIssue, DownloadOutcome, OutcomeStatus, ResultAggregator, RunSummary,
};
