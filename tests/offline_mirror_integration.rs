//! Integration tests for full mirror runs against a wiremock repository.
//!
//! Each test writes plain-text or JSON descriptors into a temp directory,
//! runs the library entry point with the real HTTP client, and checks both
//! the returned summary and the mirror tree on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use offliner_core::{
    ChecksumKind, HttpClient, OutcomeStatus, ResultAggregator, RetryPolicy, RunConfig, RunSummary,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures::{
    JAR_BYTES, JAR_PATH, POM_BYTES, POM_PATH, mount_demo_artifact, mount_file, sidecar_body,
};
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

fn write_descriptor(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write descriptor");
    path
}

fn plain_descriptor(repos: &[(&str, String)], coordinates: &[&str]) -> String {
    let mut text = String::from("# fixture descriptor\n");
    for (id, url) in repos {
        text.push_str(&format!("repo {id} {url}\n"));
    }
    for coordinate in coordinates {
        text.push_str(coordinate);
        text.push('\n');
    }
    text
}

/// Config with no retry delay so transient-failure tests stay fast.
fn fast_config(mirror: &Path, locations: Vec<PathBuf>) -> RunConfig {
    let mut config = RunConfig::new(mirror, locations);
    config.concurrency = 4;
    config.retry_policy = RetryPolicy::with_max_attempts(3).with_base_delay(Duration::ZERO);
    config.attempt_timeout = Duration::from_secs(10);
    config
}

async fn run_once(config: &RunConfig) -> RunSummary {
    let aggregator = Arc::new(ResultAggregator::new());
    offliner_core::run(
        config,
        Arc::new(HttpClient::new()),
        &aggregator,
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .expect("run should start")
}

fn read(mirror: &Path, relative: &str) -> Vec<u8> {
    std::fs::read(mirror.join(relative)).unwrap_or_else(|e| panic!("{relative}: {e}"))
}

#[tokio::test]
async fn test_full_artifact_mirrored_byte_identical() {
    let server = require_mock_server!();
    mount_demo_artifact(&server, "/central", Some(1)).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}/central", server.uri()))],
            &["org.example:demo:1.0"],
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![input])).await;

    assert!(summary.is_clean(), "unexpected failures: {:?}", summary.failures);
    assert_eq!(summary.downloaded, 6);
    assert_eq!(summary.absent, 0);
    assert_eq!(read(&mirror, JAR_PATH), JAR_BYTES);
    assert_eq!(read(&mirror, POM_PATH), POM_BYTES);
    assert_eq!(
        String::from_utf8(read(&mirror, &ChecksumKind::Sha1.sidecar_path(JAR_PATH))).unwrap(),
        sidecar_body(ChecksumKind::Sha1, JAR_BYTES, "demo-1.0.jar")
    );
    assert!(!mirror.join(format!("{JAR_PATH}.part")).exists());
}

#[tokio::test]
async fn test_shared_coordinate_fetched_once_across_descriptors() {
    let server = require_mock_server!();
    mount_demo_artifact(&server, "/central", Some(1)).await;
    let repo_url = format!("{}/central", server.uri());

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let plain = write_descriptor(
        dir.path(),
        "one.txt",
        &plain_descriptor(&[("central", repo_url.clone())], &["org.example:demo:1.0"]),
    );
    let json = write_descriptor(
        dir.path(),
        "two.json",
        &format!(
            r#"{{
  "repositories": [{{"id": "central", "url": "{repo_url}"}}],
  "dependencies": [{{"groupId": "org.example", "artifactId": "demo", "version": "1.0"}}]
}}"#
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![plain, json])).await;

    assert!(summary.is_clean());
    assert_eq!(summary.downloaded, 6);
    // `.expect(1)` on every mock is verified when the server drops.
}

#[tokio::test]
async fn test_falls_back_to_second_repository_on_404() {
    let server = require_mock_server!();
    mount_demo_artifact(&server, "/second", None).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[
                ("first", format!("{}/first", server.uri())),
                ("second", format!("{}/second", server.uri())),
            ],
            &["org.example:demo:1.0"],
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![input])).await;

    assert!(summary.is_clean(), "404 on the first repository is not an error");
    assert_eq!(summary.downloaded, 6);
    let jar = summary.outcome(JAR_PATH).expect("jar outcome recorded");
    assert_eq!(jar.status, OutcomeStatus::Succeeded);
    assert_eq!(jar.served_by.as_deref(), Some("second"));
    assert_eq!(jar.repositories_attempted(), vec!["first", "second"]);
    assert_eq!(read(&mirror, JAR_PATH), JAR_BYTES);
}

#[tokio::test]
async fn test_corrupted_sidecar_flags_mismatch_and_keeps_file() {
    let server = require_mock_server!();
    let prefix = "/central";
    mount_file(&server, prefix, JAR_PATH, JAR_BYTES.to_vec(), None).await;
    mount_file(
        &server,
        prefix,
        &ChecksumKind::Sha1.sidecar_path(JAR_PATH),
        b"0000000000000000000000000000000000000000\n".to_vec(),
        None,
    )
    .await;
    mount_file(
        &server,
        prefix,
        &ChecksumKind::Md5.sidecar_path(JAR_PATH),
        sidecar_body(ChecksumKind::Md5, JAR_BYTES, "demo-1.0.jar").into_bytes(),
        None,
    )
    .await;
    mount_file(&server, prefix, POM_PATH, POM_BYTES.to_vec(), None).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}{prefix}", server.uri()))],
            &["org.example:demo:1.0"],
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![input])).await;

    let mismatches: Vec<_> = summary
        .failures_with(OutcomeStatus::ChecksumMismatch)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].path, JAR_PATH);
    assert_eq!(mismatches[0].served_by.as_deref(), Some("central"));
    assert!(mismatches[0]
        .message
        .as_deref()
        .is_some_and(|m| m.contains("sha1")));
    assert_eq!(read(&mirror, JAR_PATH), JAR_BYTES, "mismatching file stays in place");
    assert_eq!(summary.failures.len(), 1);
}

#[tokio::test]
async fn test_missing_artifact_reports_exactly_one_error() {
    let server = require_mock_server!();

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[
                ("first", format!("{}/first", server.uri())),
                ("second", format!("{}/second", server.uri())),
            ],
            &["org.example:demo:1.0"],
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![input])).await;

    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.failures.len(), 1);
    let failure = &summary.failures[0];
    assert_eq!(failure.path, JAR_PATH);
    assert_eq!(failure.status, OutcomeStatus::NotFoundAnywhere);
    assert_eq!(failure.repositories_attempted(), vec!["first", "second"]);
    assert_eq!(summary.absent, 5, "pom and sidecars are optional");
    assert!(!mirror.join(JAR_PATH).exists());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = require_mock_server!();
    mount_demo_artifact(&server, "/central", None).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}/central", server.uri()))],
            &["org.example:demo:1.0"],
        ),
    );
    let config = fast_config(&mirror, vec![input]);

    let first = run_once(&config).await;
    let second = run_once(&config).await;

    assert!(first.is_clean() && second.is_clean());
    assert_eq!(first.downloaded, second.downloaded);
    assert_eq!(read(&mirror, JAR_PATH), JAR_BYTES);
    assert_eq!(read(&mirror, POM_PATH), POM_BYTES);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path(format!("/central/{JAR_PATH}")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_demo_artifact(&server, "/central", None).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}/central", server.uri()))],
            &["org.example:demo:1.0"],
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![input])).await;

    assert!(summary.is_clean());
    assert_eq!(summary.retried, 1);
    let jar = summary.outcome(JAR_PATH).expect("jar outcome");
    assert_eq!(jar.served_by.as_deref(), Some("central"));
    assert_eq!(jar.attempts.len(), 1, "the 503 stays in the attempt trail");
    assert_eq!(read(&mirror, JAR_PATH), JAR_BYTES);
}

#[tokio::test]
async fn test_persistent_server_error_is_transport_error() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path(format!("/central/{JAR_PATH}")))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}/central", server.uri()))],
            &["org.example:demo:1.0"],
        ),
    );
    let mut config = fast_config(&mirror, vec![input]);
    config.retry_policy = RetryPolicy::with_max_attempts(2).with_base_delay(Duration::ZERO);

    let summary = run_once(&config).await;

    let failure = summary.outcome(JAR_PATH).expect("jar outcome");
    assert_eq!(failure.status, OutcomeStatus::TransportError);
    assert_eq!(failure.attempts.len(), 2);
    assert_eq!(summary.retried, 1);
}

#[tokio::test]
async fn test_default_repository_used_after_declared_ones() {
    let server = require_mock_server!();
    mount_demo_artifact(&server, "/fallback", None).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(dir.path(), "deps.txt", "org.example:demo:1.0\n");
    let mut config = fast_config(&mirror, vec![input]);
    config.default_repositories = vec![offliner_core::RepositoryLocation::new(
        "fallback",
        &format!("{}/fallback", server.uri()),
        0,
    )];

    let summary = run_once(&config).await;

    assert!(summary.is_clean());
    assert_eq!(
        summary.outcome(JAR_PATH).and_then(|o| o.served_by.as_deref()),
        Some("fallback")
    );
}

#[tokio::test]
async fn test_malformed_coordinate_is_a_descriptor_issue() {
    let server = require_mock_server!();
    mount_demo_artifact(&server, "/central", None).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}/central", server.uri()))],
            &["org.example:demo:1.0", "just-one-part"],
        ),
    );

    let summary = run_once(&fast_config(&mirror, vec![input])).await;

    assert_eq!(summary.downloaded, 6);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.descriptor_issues.len(), 1);
    assert!(!summary.is_clean());
}

#[tokio::test]
async fn test_interrupted_before_start_cancels_everything() {
    let server: MockServer = require_mock_server!();
    mount_demo_artifact(&server, "/central", Some(0)).await;

    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let input = write_descriptor(
        dir.path(),
        "deps.txt",
        &plain_descriptor(
            &[("central", format!("{}/central", server.uri()))],
            &["org.example:demo:1.0"],
        ),
    );

    let aggregator = Arc::new(ResultAggregator::new());
    let summary = offliner_core::run(
        &fast_config(&mirror, vec![input]),
        Arc::new(HttpClient::new()),
        &aggregator,
        Arc::new(AtomicBool::new(true)),
    )
    .await
    .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.cancelled, 6);
    assert_eq!(summary.downloaded, 0);
}
