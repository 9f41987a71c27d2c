//! Fetch targets and the target set builder.
//!
//! Every declared dependency expands into:
//! - the artifact itself,
//! - its project descriptor (`.pom`), implied for every coordinate,
//! - one checksum sidecar per configured kind for each of the two.
//!
//! Targets from all input descriptors are merged by path. Merging keeps the
//! first-seen position, unions the candidate repositories (first-seen order,
//! deduplicated by base URI) and marks the target required if any
//! contributor required it.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::checksum::{ChecksumKind, DEFAULT_CHECKSUM_KINDS};
use crate::coordinate::ArtifactCoordinate;
use crate::descriptor::ParsedDescriptor;
use crate::repository::{DEFAULT_RANK_BASE, RepositoryLocation};

/// What a target's file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A declared artifact.
    Artifact,
    /// The project descriptor implied by a declared artifact.
    Descriptor,
    /// A checksum sidecar for another target.
    Sidecar(ChecksumKind),
}

impl TargetKind {
    /// Sidecars are fetched before the files they describe.
    #[must_use]
    pub fn is_sidecar(self) -> bool {
        matches!(self, Self::Sidecar(_))
    }
}

/// A single repository-relative path to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchTarget {
    path: String,
    kind: TargetKind,
    required: bool,
    repositories: Vec<RepositoryLocation>,
    checksums: Vec<ChecksumKind>,
}

impl FetchTarget {
    /// Repository-relative path; also the identity of the target.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Whether absence at every repository is a run error.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Candidate repositories in merge order.
    #[must_use]
    pub fn repositories(&self) -> &[RepositoryLocation] {
        &self.repositories
    }

    /// Sidecar kinds expected for this file (empty for sidecars).
    #[must_use]
    pub fn checksums(&self) -> &[ChecksumKind] {
        &self.checksums
    }

    fn merge(&mut self, other: FetchTarget) {
        self.required |= other.required;
        for repo in other.repositories {
            if !self
                .repositories
                .iter()
                .any(|existing| existing.base_uri() == repo.base_uri())
            {
                self.repositories.push(repo);
            }
        }
        for kind in other.checksums {
            if !self.checksums.contains(&kind) {
                self.checksums.push(kind);
            }
        }
    }
}

/// Deduplicated, order-stable collection of targets.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    targets: Vec<FetchTarget>,
}

impl TargetSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FetchTarget> {
        self.targets.iter().find(|t| t.path == path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FetchTarget> {
        self.targets.iter()
    }

    /// Splits into (sidecars, primary files), each keeping set order.
    #[must_use]
    pub fn into_phases(self) -> (Vec<FetchTarget>, Vec<FetchTarget>) {
        self.targets
            .into_iter()
            .partition(|target| target.kind.is_sidecar())
    }
}

impl IntoIterator for TargetSet {
    type Item = FetchTarget;
    type IntoIter = std::vec::IntoIter<FetchTarget>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a FetchTarget;
    type IntoIter = std::slice::Iter<'a, FetchTarget>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

/// Expands descriptors into a [`TargetSet`].
#[derive(Debug, Clone)]
pub struct TargetSetBuilder {
    checksum_kinds: Vec<ChecksumKind>,
    default_repositories: Vec<RepositoryLocation>,
    targets: IndexMap<String, FetchTarget>,
}

impl Default for TargetSetBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKSUM_KINDS.to_vec(), Vec::new())
    }
}

impl TargetSetBuilder {
    /// Creates a builder.
    ///
    /// Default repositories are re-ranked after every descriptor-declared one,
    /// keeping their relative order.
    #[must_use]
    pub fn new(
        checksum_kinds: Vec<ChecksumKind>,
        default_repositories: Vec<RepositoryLocation>,
    ) -> Self {
        let mut kinds = Vec::with_capacity(checksum_kinds.len());
        for kind in checksum_kinds {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        let default_repositories = default_repositories
            .into_iter()
            .enumerate()
            .map(|(index, repo)| {
                let offset = u32::try_from(index).unwrap_or(u32::MAX - DEFAULT_RANK_BASE);
                repo.with_rank(DEFAULT_RANK_BASE.saturating_add(offset))
            })
            .collect();
        Self {
            checksum_kinds: kinds,
            default_repositories,
            targets: IndexMap::new(),
        }
    }

    /// Adds every dependency of `descriptor`.
    pub fn add_descriptor(&mut self, descriptor: &ParsedDescriptor) {
        let mut repositories = descriptor.repositories.clone();
        repositories.extend(self.default_repositories.iter().cloned());

        for coordinate in &descriptor.dependencies {
            self.add_coordinate(coordinate, &repositories);
        }
        debug!(
            location = %descriptor.location.display(),
            dependencies = descriptor.dependencies.len(),
            targets = self.targets.len(),
            "expanded descriptor"
        );
    }

    /// Adds one coordinate with an explicit candidate list.
    pub fn add_coordinate(
        &mut self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RepositoryLocation],
    ) {
        let artifact_path = coordinate.relative_path();
        let descriptor_path = coordinate.descriptor().relative_path();

        self.add_with_sidecars(artifact_path, TargetKind::Artifact, true, repositories);
        self.add_with_sidecars(descriptor_path, TargetKind::Descriptor, false, repositories);
    }

    /// Finishes building.
    #[must_use]
    pub fn build(self) -> TargetSet {
        TargetSet {
            targets: self.targets.into_values().collect(),
        }
    }

    fn add_with_sidecars(
        &mut self,
        path: String,
        kind: TargetKind,
        required: bool,
        repositories: &[RepositoryLocation],
    ) {
        for checksum in self.checksum_kinds.clone() {
            self.insert(FetchTarget {
                path: checksum.sidecar_path(&path),
                kind: TargetKind::Sidecar(checksum),
                required: false,
                repositories: repositories.to_vec(),
                checksums: Vec::new(),
            });
        }
        self.insert(FetchTarget {
            path,
            kind,
            required,
            repositories: repositories.to_vec(),
            checksums: self.checksum_kinds.clone(),
        });
    }

    fn insert(&mut self, target: FetchTarget) {
        match self.targets.get_mut(&target.path) {
            Some(existing) => {
                // A declared `pom` artifact and an implied descriptor share a path.
                if existing.kind == TargetKind::Descriptor && target.kind == TargetKind::Artifact {
                    existing.kind = TargetKind::Artifact;
                }
                existing.merge(target);
                rank_by_position(&mut existing.repositories);
            }
            None => {
                let mut target = target;
                dedup_by_base_uri(&mut target.repositories);
                rank_by_position(&mut target.repositories);
                self.targets.insert(target.path.clone(), target);
            }
        }
    }
}

fn dedup_by_base_uri(repositories: &mut Vec<RepositoryLocation>) {
    let mut seen = std::collections::HashSet::new();
    repositories.retain(|repo| seen.insert(repo.base_uri().to_string()));
}

/// Ranks declared repositories by their first-seen position in the merged
/// list. Defaults keep their ranks at or above [`DEFAULT_RANK_BASE`].
fn rank_by_position(repositories: &mut [RepositoryLocation]) {
    let mut position = 0u32;
    for repo in repositories.iter_mut() {
        if repo.rank() < DEFAULT_RANK_BASE {
            *repo = repo.clone().with_rank(position);
            position = position.saturating_add(1).min(DEFAULT_RANK_BASE - 1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn descriptor(deps: &[&str], repos: &[(&str, &str)]) -> ParsedDescriptor {
        let mut parsed = ParsedDescriptor::new("test");
        for (id, url) in repos {
            parsed.declare_repository(id, url);
        }
        for dep in deps {
            parsed.push_dependency(ArtifactCoordinate::parse(dep));
        }
        parsed
    }

    fn paths(set: &TargetSet) -> Vec<&str> {
        set.iter().map(FetchTarget::path).collect()
    }

    #[test]
    fn test_single_dependency_expands_to_six_targets() {
        let mut builder = TargetSetBuilder::default();
        builder.add_descriptor(&descriptor(&["org.x:a:1"], &[("r", "http://r/")]));
        let set = builder.build();

        assert_eq!(
            paths(&set),
            vec![
                "org/x/a/1/a-1.jar.md5",
                "org/x/a/1/a-1.jar.sha1",
                "org/x/a/1/a-1.jar",
                "org/x/a/1/a-1.pom.md5",
                "org/x/a/1/a-1.pom.sha1",
                "org/x/a/1/a-1.pom",
            ]
        );
        let jar = set.get("org/x/a/1/a-1.jar").unwrap();
        assert!(jar.is_required());
        assert_eq!(jar.checksums(), &DEFAULT_CHECKSUM_KINDS);
        assert!(!set.get("org/x/a/1/a-1.pom").unwrap().is_required());
        assert!(!set.get("org/x/a/1/a-1.jar.md5").unwrap().is_required());
    }

    #[test]
    fn test_configured_checksum_kinds_drive_sidecars() {
        let mut builder = TargetSetBuilder::new(vec![ChecksumKind::Sha256], Vec::new());
        builder.add_descriptor(&descriptor(&["g:a:1"], &[]));
        let set = builder.build();
        assert_eq!(set.len(), 4);
        assert!(set.get("g/a/1/a-1.jar.sha256").is_some());
        assert!(set.get("g/a/1/a-1.jar.md5").is_none());
    }

    #[test]
    fn test_default_repositories_follow_declared() {
        let defaults = vec![RepositoryLocation::new("central", "http://central/", 0)];
        let mut builder = TargetSetBuilder::new(vec![], defaults);
        builder.add_descriptor(&descriptor(&["g:a:1"], &[("own", "http://own/")]));
        let set = builder.build();

        let jar = set.get("g/a/1/a-1.jar").unwrap();
        let ids: Vec<&str> = jar.repositories().iter().map(RepositoryLocation::id).collect();
        assert_eq!(ids, vec!["own", "central"]);
        assert!(jar.repositories()[1].rank() >= DEFAULT_RANK_BASE);
    }

    #[test]
    fn test_same_coordinate_across_descriptors_deduplicated() {
        let mut builder = TargetSetBuilder::default();
        builder.add_descriptor(&descriptor(&["g:a:1"], &[("one", "http://one/")]));
        builder.add_descriptor(&descriptor(
            &["g:a:1"],
            &[("two", "http://two/"), ("one-again", "http://one")],
        ));
        let set = builder.build();

        assert_eq!(set.len(), 6);
        let jar = set.get("g/a/1/a-1.jar").unwrap();
        let ids: Vec<&str> = jar.repositories().iter().map(RepositoryLocation::id).collect();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[test]
    fn test_merged_repositories_tried_in_first_seen_order() {
        let defaults = vec![RepositoryLocation::new("central", "http://central/", 0)];
        let mut builder = TargetSetBuilder::new(vec![], defaults);
        builder.add_descriptor(&descriptor(&["g:a:1"], &[("x", "http://x/"), ("y", "http://y/")]));
        builder.add_descriptor(&descriptor(&["g:a:1"], &[("z", "http://z/")]));
        let set = builder.build();

        let jar = set.get("g/a/1/a-1.jar").unwrap();
        let resolver = crate::repository::RepositoryResolver::new();
        let tried: Vec<&str> = resolver
            .candidates(jar.repositories())
            .map(RepositoryLocation::id)
            .collect();
        assert_eq!(tried, vec!["x", "y", "z", "central"]);
    }

    #[test]
    fn test_declared_pom_merges_with_implied_descriptor() {
        let mut builder = TargetSetBuilder::new(vec![], Vec::new());
        builder.add_descriptor(&descriptor(&["g:parent:pom:1", "g:parent:1"], &[]));
        let set = builder.build();

        let pom = set.get("g/parent/1/parent-1.pom").unwrap();
        assert_eq!(pom.kind(), TargetKind::Artifact);
        assert!(pom.is_required());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_into_phases_separates_sidecars() {
        let mut builder = TargetSetBuilder::default();
        builder.add_descriptor(&descriptor(&["g:a:1"], &[]));
        let (sidecars, primaries) = builder.build().into_phases();
        assert_eq!(sidecars.len(), 4);
        assert_eq!(primaries.len(), 2);
        assert!(sidecars.iter().all(|t| t.kind().is_sidecar()));
        assert_eq!(primaries[0].kind(), TargetKind::Artifact);
        assert_eq!(primaries[1].kind(), TargetKind::Descriptor);
    }

    #[test]
    fn test_duplicate_checksum_kinds_collapsed() {
        let builder =
            TargetSetBuilder::new(vec![ChecksumKind::Md5, ChecksumKind::Md5], Vec::new());
        assert_eq!(builder.checksum_kinds, vec![ChecksumKind::Md5]);
    }
}
