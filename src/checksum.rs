//! Checksum sidecars and verification of downloaded files.
//!
//! Repositories publish digests next to each file at a fixed suffixed path
//! (`foo.jar.md5`, `foo.jar.sha1`, ...). The [`ChecksumVerifier`] remembers
//! every sidecar fetched during a run and checks primary files against them.
//! A file with no fetched sidecar passes: not every repository publishes
//! every digest kind.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use dashmap::DashMap;
use md5::Md5;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, warn};

use crate::download::DownloadError;

/// Supported sidecar digest kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumKind {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

/// Checksum kinds requested when none are configured.
pub const DEFAULT_CHECKSUM_KINDS: [ChecksumKind; 2] = [ChecksumKind::Md5, ChecksumKind::Sha1];

impl ChecksumKind {
    /// All supported kinds.
    pub const ALL: [ChecksumKind; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    /// Fixed suffix appended to a file's path to locate its sidecar.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Md5 => ".md5",
            Self::Sha1 => ".sha1",
            Self::Sha256 => ".sha256",
            Self::Sha512 => ".sha512",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Sidecar path for `path`.
    #[must_use]
    pub fn sidecar_path(self, path: &str) -> String {
        format!("{path}{}", self.suffix())
    }

    /// Lowercase hex digest of `bytes`.
    #[must_use]
    pub fn digest_hex(self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", Md5::digest(bytes)),
            Self::Sha1 => format!("{:x}", Sha1::digest(bytes)),
            Self::Sha256 => format!("{:x}", Sha256::digest(bytes)),
            Self::Sha512 => format!("{:x}", Sha512::digest(bytes)),
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown checksum kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown checksum kind '{0}' (expected md5, sha1, sha256 or sha512)")]
pub struct UnknownChecksumKind(pub String);

impl FromStr for ChecksumKind {
    type Err = UnknownChecksumKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(UnknownChecksumKind(s.to_string())),
        }
    }
}

/// Extracts the digest from sidecar text.
///
/// Sidecars usually hold just the hex digest; some tools append the file
/// name (`<hex>  name.jar`), so only the first token is kept.
#[must_use]
pub fn parse_sidecar(contents: &str) -> Option<String> {
    contents
        .split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
}

/// A digest disagreement for one sidecar kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMismatch {
    pub kind: ChecksumKind,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for ChecksumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mismatch: sidecar says {}, file hashes to {}",
            self.kind, self.expected, self.actual
        )
    }
}

/// Outcome of verifying one downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Every fetched sidecar matched. Holds the kinds actually checked (may be empty).
    Verified(Vec<ChecksumKind>),
    /// At least one sidecar disagreed.
    Mismatch(ChecksumMismatch),
}

/// Run-scoped registry of fetched sidecar digests.
///
/// Shared across scheduler workers; each sidecar path is written once.
#[derive(Debug, Default)]
pub struct ChecksumVerifier {
    sidecars: DashMap<String, String>,
}

impl ChecksumVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the content of a successfully fetched sidecar.
    ///
    /// Empty sidecars are ignored so they never fail a parent file.
    pub fn record_sidecar(&self, sidecar_path: &str, contents: &str) {
        match parse_sidecar(contents) {
            Some(digest) => {
                debug!(path = sidecar_path, %digest, "recorded sidecar digest");
                self.sidecars.insert(sidecar_path.to_string(), digest);
            }
            None => warn!(path = sidecar_path, "empty checksum sidecar ignored"),
        }
    }

    /// Number of recorded sidecars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sidecars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sidecars.is_empty()
    }

    /// Checks in-memory bytes for `path` against every recorded sidecar of `kinds`.
    #[must_use]
    pub fn verify_bytes(&self, path: &str, kinds: &[ChecksumKind], bytes: &[u8]) -> Verification {
        let mut checked = Vec::new();
        for &kind in kinds {
            let Some(expected) = self
                .sidecars
                .get(&kind.sidecar_path(path))
                .map(|entry| entry.value().clone())
            else {
                continue;
            };
            let actual = kind.digest_hex(bytes);
            if !actual.eq_ignore_ascii_case(&expected) {
                return Verification::Mismatch(ChecksumMismatch {
                    kind,
                    expected,
                    actual,
                });
            }
            checked.push(kind);
        }
        Verification::Verified(checked)
    }

    /// Verifies the file written at `file` for repository path `path`.
    ///
    /// The file is only read when at least one matching sidecar was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the downloaded file cannot be read back.
    pub async fn verify_file(
        &self,
        path: &str,
        kinds: &[ChecksumKind],
        file: &Path,
    ) -> Result<Verification, DownloadError> {
        let has_sidecar = kinds
            .iter()
            .any(|kind| self.sidecars.contains_key(&kind.sidecar_path(path)));
        if !has_sidecar {
            return Ok(Verification::Verified(Vec::new()));
        }
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| DownloadError::io(file, e))?;
        Ok(self.verify_bytes(path, kinds, &bytes))
    }
}
