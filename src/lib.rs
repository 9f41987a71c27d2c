//! Offliner Core Library
//!
//! Builds a local, offline mirror of Maven-layout repository content: given
//! dependency descriptors, it fetches every artifact, its project descriptor
//! and their checksum sidecars from an ordered list of remote repositories
//! into a directory tree laid out like a repository.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`coordinate`] - Artifact coordinates and repository-relative paths
//! - [`descriptor`] - Input readers producing coordinates and declared repositories
//! - [`repository`] - Repository locations and candidate ordering
//! - [`target`] - Target set expansion and deduplication
//! - [`checksum`] - Sidecar digests and verification
//! - [`download`] - HTTP transport, retry policy, scheduler and result aggregation
//! - [`run`] - Run orchestration from inputs to [`RunSummary`]

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod checksum;
pub mod coordinate;
pub mod descriptor;
pub mod download;
pub mod repository;
pub mod run;
pub mod target;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use checksum::{ChecksumKind, ChecksumVerifier, DEFAULT_CHECKSUM_KINDS, Verification};
pub use coordinate::{ArtifactCoordinate, InvalidCoordinate};
pub use descriptor::{DescriptorError, DescriptorReader, DescriptorReaders, ParsedDescriptor};
pub use download::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DescriptorIssue, DownloadError, DownloadOutcome,
    DownloadScheduler, EngineError, Fetcher, HttpClient, OutcomeStatus, ResultAggregator,
    RetryPolicy, RunSummary,
};
pub use repository::{RepositoryLocation, RepositoryResolver};
pub use run::{RunConfig, RunError, RunPlan, execute, plan, run};
pub use target::{FetchTarget, TargetKind, TargetSet, TargetSetBuilder};
