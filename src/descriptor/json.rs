//! JSON project descriptor reader.
//!
//! ```json
//! {
//!   "repositories": [{ "id": "central", "url": "https://repo.example.org/maven2" }],
//!   "dependencies": [
//!     { "groupId": "org.example", "artifactId": "demo", "version": "1.0",
//!       "type": "jar", "classifier": "sources" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::{DescriptorError, DescriptorReader, ParsedDescriptor};
use crate::coordinate::ArtifactCoordinate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDocument {
    #[serde(default)]
    repositories: Vec<RepositoryEntry>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    #[serde(default)]
    id: Option<String>,
    url: String,
}

// Fields are optional so a missing one becomes a per-dependency
// InvalidCoordinate rather than failing the whole document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyEntry {
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    artifact_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    classifier: Option<String>,
}

/// Reads `*.json` project descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDescriptorReader;

impl DescriptorReader for JsonDescriptorReader {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepts(&self, location: &Path) -> bool {
        location
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn read(&self, location: &Path, contents: &str) -> Result<ParsedDescriptor, DescriptorError> {
        let document: ProjectDocument = serde_json::from_str(contents)
            .map_err(|e| DescriptorError::parse(location, e.to_string()))?;

        let mut parsed = ParsedDescriptor::new(location);
        for (index, repo) in document.repositories.iter().enumerate() {
            let id = repo
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("repo-{}", index + 1));
            parsed.declare_repository(&id, &repo.url);
        }
        for dep in &document.dependencies {
            parsed.push_dependency(ArtifactCoordinate::new(
                dep.group_id.as_deref().unwrap_or_default(),
                dep.artifact_id.as_deref().unwrap_or_default(),
                dep.version.as_deref().unwrap_or_default(),
                dep.kind.as_deref(),
                dep.classifier.as_deref(),
            ));
        }
        Ok(parsed)
    }
}
