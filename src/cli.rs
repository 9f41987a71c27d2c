//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use offliner_core::ChecksumKind;
use offliner_core::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use offliner_core::{DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};

/// Default mirror directory, relative to the working directory.
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

/// Default base retry delay in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Build an offline mirror of Maven-layout repository content.
///
/// Reads dependency descriptors (JSON project descriptors or plain coordinate
/// lists), then fetches every artifact, its `.pom` and their checksum sidecars
/// into a local directory laid out like a repository.
#[derive(Parser, Debug, Clone)]
#[command(name = "offliner")]
#[command(author, version, about)]
pub struct Args {
    /// Descriptor or coordinate-list files to mirror
    #[arg(value_name = "LOCATION")]
    pub locations: Vec<PathBuf>,

    /// Mirror directory (created if absent)
    #[arg(short = 'd', long = "downloads", value_name = "DIR", default_value = DEFAULT_DOWNLOADS_DIR)]
    pub downloads: PathBuf,

    /// Default repository tried after descriptor-declared ones (repeatable)
    #[arg(short = 'r', long = "repo", value_name = "[ID=]URL")]
    pub repositories: Vec<String>,

    /// Maximum concurrent fetches (1-100)
    #[arg(short = 't', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub threads: u8,

    /// Attempts per repository for transient failures (1-10)
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Base retry delay in milliseconds, doubled per attempt (max 60000)
    #[arg(long, default_value_t = DEFAULT_BACKOFF_MS, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub backoff_ms: u64,

    /// Per-attempt timeout in seconds, including the body (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: u64,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: u64,

    /// Checksum sidecar kind to fetch and verify (repeatable; md5, sha1, sha256, sha512)
    #[arg(long = "checksum", value_name = "KIND")]
    pub checksums: Vec<ChecksumKind>,

    /// Print the planned targets and their repositories without fetching
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run summary as JSON to FILE
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Read defaults from FILE instead of the user config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
