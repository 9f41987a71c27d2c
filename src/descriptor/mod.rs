//! Input descriptors: dependency coordinates plus declared repositories.
//!
//! Descriptor grammar parsing sits behind the [`DescriptorReader`] trait. Each
//! reader turns one input location into a [`ParsedDescriptor`]; the target
//! builder never sees the raw format.
//!
//! Built-in readers:
//! - [`JsonDescriptorReader`] - project descriptor documents (`*.json`)
//! - [`PlainTextReader`] - one Maven coordinate per line (everything else)

mod error;
mod json;
mod plaintext;

pub use error::DescriptorError;
pub use json::JsonDescriptorReader;
pub use plaintext::PlainTextReader;

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::coordinate::{ArtifactCoordinate, InvalidCoordinate};
use crate::repository::RepositoryLocation;

/// One input location after parsing.
#[derive(Debug, Clone, Default)]
pub struct ParsedDescriptor {
    /// Where the descriptor was read from.
    pub location: PathBuf,
    /// Well-formed dependency coordinates, in declaration order.
    pub dependencies: Vec<ArtifactCoordinate>,
    /// Declared repositories, in declaration order (rank = position).
    pub repositories: Vec<RepositoryLocation>,
    /// Dependencies that failed coordinate validation.
    pub invalid: Vec<InvalidCoordinate>,
}

impl ParsedDescriptor {
    /// Creates an empty descriptor for `location`.
    #[must_use]
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Appends a repository, ranking it after those already declared.
    pub fn declare_repository(&mut self, id: &str, url: &str) {
        let rank = u32::try_from(self.repositories.len()).unwrap_or(u32::MAX);
        self.repositories.push(RepositoryLocation::new(id, url, rank));
    }

    /// Records the result of validating one dependency.
    pub fn push_dependency(&mut self, dependency: Result<ArtifactCoordinate, InvalidCoordinate>) {
        match dependency {
            Ok(coordinate) => self.dependencies.push(coordinate),
            Err(invalid) => self.invalid.push(invalid),
        }
    }
}

/// Parses one descriptor format.
pub trait DescriptorReader: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this reader handles `location`.
    fn accepts(&self, location: &Path) -> bool;

    /// Parses `contents` read from `location`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Parse`] when the document as a whole cannot
    /// be understood. Individual bad dependencies go to
    /// [`ParsedDescriptor::invalid`] instead.
    fn read(&self, location: &Path, contents: &str) -> Result<ParsedDescriptor, DescriptorError>;
}

/// Ordered set of readers; the first one that accepts a location wins.
pub struct DescriptorReaders {
    readers: Vec<Box<dyn DescriptorReader>>,
}

impl std::fmt::Debug for DescriptorReaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.readers.iter().map(|r| r.name()))
            .finish()
    }
}

impl Default for DescriptorReaders {
    fn default() -> Self {
        let mut readers = Self::empty();
        readers.register(Box::new(JsonDescriptorReader));
        readers.register(Box::new(PlainTextReader));
        readers
    }
}

impl DescriptorReaders {
    /// Creates a registry with no readers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Adds a reader after the existing ones.
    pub fn register(&mut self, reader: Box<dyn DescriptorReader>) {
        self.readers.push(reader);
    }

    /// Reads and parses the descriptor at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Read`] if the file cannot be read,
    /// [`DescriptorError::Unsupported`] if no reader accepts it, or the
    /// reader's parse error.
    #[instrument(skip(self), fields(location = %location.display()))]
    pub async fn load(&self, location: &Path) -> Result<ParsedDescriptor, DescriptorError> {
        let reader = self
            .readers
            .iter()
            .find(|reader| reader.accepts(location))
            .ok_or_else(|| DescriptorError::unsupported(location))?;

        let contents = tokio::fs::read_to_string(location)
            .await
            .map_err(|e| DescriptorError::read(location, e))?;

        let parsed = reader.read(location, &contents)?;
        debug!(
            reader = reader.name(),
            dependencies = parsed.dependencies.len(),
            repositories = parsed.repositories.len(),
            invalid = parsed.invalid.len(),
            "parsed descriptor"
        );
        Ok(parsed)
    }
}
