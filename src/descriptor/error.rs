//! Descriptor-level errors.
//!
//! A descriptor error skips that one input location; the run continues with
//! the others.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that prevent an input location from being used at all.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The location could not be read from disk.
    #[error("cannot read descriptor {path}: {source}")]
    Read {
        /// The input location.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document could not be parsed.
    #[error("cannot parse descriptor {path}: {message}")]
    Parse {
        /// The input location.
        path: PathBuf,
        /// What went wrong, with line information when available.
        message: String,
    },

    /// No registered reader accepts this location.
    #[error("no descriptor reader accepts {path}")]
    Unsupported {
        /// The input location.
        path: PathBuf,
    },
}

impl DescriptorError {
    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported-format error.
    pub fn unsupported(path: impl Into<PathBuf>) -> Self {
        Self::Unsupported { path: path.into() }
    }

    /// The input location this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Unsupported { path } => path,
        }
    }
}
