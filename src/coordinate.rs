//! Artifact coordinates and Maven repository layout paths.
//!
//! A coordinate identifies one file in a repository:
//! `group:artifact[:extension[:classifier]]:version`. The repository-relative
//! path is derived as
//! `group/segments/artifact/version/artifact-version[-classifier].extension`.
//!
//! # Example
//!
//! ```
//! use offliner_core::coordinate::ArtifactCoordinate;
//!
//! let coord = ArtifactCoordinate::parse("org.example:demo:1.0").unwrap();
//! assert_eq!(coord.relative_path(), "org/example/demo/1.0/demo-1.0.jar");
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Extension used when a coordinate does not declare one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Extension of the project descriptor accompanying every artifact.
pub const DESCRIPTOR_EXTENSION: &str = "pom";

/// Malformed coordinate input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCoordinate {
    /// A required field was empty or absent.
    #[error("invalid coordinate '{input}': missing {field}")]
    MissingField {
        /// Name of the missing field (`groupId`, `artifactId`, ...).
        field: &'static str,
        /// The coordinate as it was given.
        input: String,
    },

    /// The coordinate string has the wrong number of segments.
    #[error(
        "invalid coordinate '{input}': expected group:artifact[:extension[:classifier]]:version"
    )]
    Malformed {
        /// The coordinate as it was given.
        input: String,
    },

    /// A field contains characters that would escape the repository layout.
    #[error("invalid coordinate '{input}': {field} contains illegal characters")]
    IllegalCharacters {
        /// Name of the offending field.
        field: &'static str,
        /// The coordinate as it was given.
        input: String,
    },
}

/// Immutable artifact identity. Equality covers all five fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    classifier: Option<String>,
    extension: String,
}

impl ArtifactCoordinate {
    /// Builds a coordinate from its parts.
    ///
    /// Empty `classifier` is treated as absent; empty `extension` falls back to
    /// [`DEFAULT_EXTENSION`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinate`] when group, artifact or version is empty, or
    /// when any field contains a path separator or `..`.
    pub fn new(
        group_id: &str,
        artifact_id: &str,
        version: &str,
        extension: Option<&str>,
        classifier: Option<&str>,
    ) -> Result<Self, InvalidCoordinate> {
        let display = format!("{group_id}:{artifact_id}:{version}");
        let group_id = required("groupId", group_id, &display)?;
        let artifact_id = required("artifactId", artifact_id, &display)?;
        let version = required("version", version, &display)?;
        let extension = match extension.map(str::trim).filter(|e| !e.is_empty()) {
            Some(ext) => checked("extension", ext, &display)?,
            None => DEFAULT_EXTENSION.to_string(),
        };
        let classifier = match classifier.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => Some(checked("classifier", c, &display)?),
            None => None,
        };

        Ok(Self {
            group_id,
            artifact_id,
            version,
            classifier,
            extension,
        })
    }

    /// Parses Maven notation `group:artifact[:extension[:classifier]]:version`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinate::Malformed`] for fewer than three or more than
    /// five segments, otherwise the same errors as [`ArtifactCoordinate::new`].
    pub fn parse(input: &str) -> Result<Self, InvalidCoordinate> {
        let input = input.trim();
        let parts: Vec<&str> = input.split(':').map(str::trim).collect();
        let result = match parts.as_slice() {
            [g, a, v] => Self::new(g, a, v, None, None),
            [g, a, ext, v] => Self::new(g, a, v, Some(ext), None),
            [g, a, ext, classifier, v] => Self::new(g, a, v, Some(ext), Some(classifier)),
            _ => {
                return Err(InvalidCoordinate::Malformed {
                    input: input.to_string(),
                });
            }
        };
        // Report the caller's text rather than the normalized g:a:v form.
        result.map_err(|err| match err {
            InvalidCoordinate::MissingField { field, .. } => InvalidCoordinate::MissingField {
                field,
                input: input.to_string(),
            },
            InvalidCoordinate::IllegalCharacters { field, .. } => {
                InvalidCoordinate::IllegalCharacters {
                    field,
                    input: input.to_string(),
                }
            }
            other => other,
        })
    }

    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the coordinate of the project descriptor for this artifact.
    ///
    /// The descriptor never carries a classifier.
    #[must_use]
    pub fn descriptor(&self) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            classifier: None,
            extension: DESCRIPTOR_EXTENSION.to_string(),
        }
    }

    /// Returns the canonical repository-relative path, `/`-separated, without a
    /// leading slash.
    #[must_use]
    pub fn relative_path(&self) -> String {
        let group_path = self.group_id.replace('.', "/");
        let file_name = match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        };
        format!(
            "{group_path}/{}/{}/{file_name}",
            self.artifact_id, self.version
        )
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.version)
    }
}

fn required(field: &'static str, value: &str, input: &str) -> Result<String, InvalidCoordinate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InvalidCoordinate::MissingField {
            field,
            input: input.to_string(),
        });
    }
    checked(field, value, input)
}

fn checked(field: &'static str, value: &str, input: &str) -> Result<String, InvalidCoordinate> {
    if value.contains('/') || value.contains('\\') || value.contains("..") {
        return Err(InvalidCoordinate::IllegalCharacters {
            field,
            input: input.to_string(),
        });
    }
    Ok(value.to_string())
}
