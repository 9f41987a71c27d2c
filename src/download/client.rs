//! HTTP transport for fetching repository files into the mirror.
//!
//! The scheduler only depends on the [`Fetcher`] trait: "GET this URL and
//! write the body to this path". [`HttpClient`] is the reqwest-backed
//! implementation used in production.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PARTIAL_SUFFIX, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Fetches one URL into one local file.
///
/// Implementations must:
/// - return `Ok(bytes_written)` only for a 2xx response whose full body is at
///   `destination`,
/// - return [`DownloadError::HttpStatus`] for any other status,
/// - create missing parent directories of `destination`,
/// - never leave a partial file at `destination`.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Downloads `url` to `destination`, replacing any existing file.
    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> Result<u64, DownloadError>;
}

/// HTTP client for downloading repository files with streaming support.
///
/// Created once per run and shared by all workers, taking advantage of
/// connection pooling.
///
/// # Example
///
/// ```no_run
/// use offliner_core::download::HttpClient;
/// use std::path::Path;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let url = Url::parse("https://repo.example.org/maven2/g/a/1/a-1.jar")?;
/// let bytes = client.download_to_path(&url, Path::new("./mirror/g/a/1/a-1.jar")).await?;
/// println!("Downloaded {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Downloads `url` to `destination`.
    ///
    /// The body is streamed into `<destination>.part` and renamed into place
    /// once complete, so an interrupted transfer never looks like a finished
    /// file.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - the request fails (network error, timeout)
    /// - the server returns a non-2xx status
    /// - creating directories, writing or renaming fails
    #[instrument(skip(self), fields(url = %url, destination = %destination.display()))]
    pub async fn download_to_path(
        &self,
        url: &Url,
        destination: &Path,
    ) -> Result<u64, DownloadError> {
        debug!("starting download");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url.as_str())
            } else {
                DownloadError::network(url.as_str(), e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let partial = partial_path(destination);
        let mut file = File::create(&partial)
            .await
            .map_err(|e| DownloadError::io(partial.clone(), e))?;

        let stream_result = stream_to_file(&mut file, response, url, &partial).await;
        drop(file);

        let bytes_written = match stream_result {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(path = %partial.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(error);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, destination).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(DownloadError::io(destination, e));
        }

        debug!(bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> Result<u64, DownloadError> {
        self.download_to_path(url, destination).await
    }
}

/// Temporary path a body is streamed into before being renamed onto `destination`.
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &Url,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url.as_str())
            } else {
                DownloadError::network(url.as_str(), e)
            }
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
