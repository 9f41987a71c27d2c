//! Remote repository locations and candidate ordering.
//!
//! A [`RepositoryLocation`] is a base URI plus an identifier and a priority
//! rank. The [`RepositoryResolver`] turns a target's candidate list into a lazy
//! iterator that yields enabled locations in rank order, skipping repeated
//! base URIs. Exhausting the iterator without a successful fetch means the
//! target was not found anywhere.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use url::Url;

use crate::download::DownloadError;

/// Rank offset applied to process-wide default repositories so they always
/// sort after descriptor-declared ones.
pub const DEFAULT_RANK_BASE: u32 = 10_000;

/// A remote repository a target may be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryLocation {
    id: String,
    base_uri: String,
    rank: u32,
    enabled: bool,
}

impl RepositoryLocation {
    /// Creates an enabled location.
    ///
    /// The base URI is normalized to end with exactly one `/` so relative
    /// paths can be appended verbatim.
    #[must_use]
    pub fn new(id: impl Into<String>, base_uri: &str, rank: u32) -> Self {
        let trimmed = base_uri.trim().trim_end_matches('/');
        Self {
            id: id.into(),
            base_uri: format!("{trimmed}/"),
            rank,
            enabled: true,
        }
    }

    /// Parses `[id=]url`. Without an explicit id, `fallback_id` is used.
    #[must_use]
    pub fn parse_entry(entry: &str, fallback_id: &str, rank: u32) -> Self {
        match entry.split_once('=') {
            Some((id, url)) if !id.trim().is_empty() && !id.contains("://") => {
                Self::new(id.trim(), url, rank)
            }
            _ => Self::new(fallback_id, entry, rank),
        }
    }

    /// Returns a copy with the enabled flag set.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns a copy with a different rank.
    #[must_use]
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base URI, always `/`-terminated.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Builds the request URL for a repository-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] when the base URI plus path does
    /// not form an absolute URL.
    pub fn url_for(&self, relative_path: &str) -> Result<Url, DownloadError> {
        let joined = format!("{}{}", self.base_uri, relative_path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|_| DownloadError::invalid_url(joined))
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.base_uri)
    }
}

/// Orders and filters a target's candidate repositories.
///
/// Pure: no network access. Disabled locations are dropped, duplicates (by
/// base URI) keep their first occurrence, and the rest are yielded by
/// ascending rank with declaration order breaking ties.
#[derive(Debug, Clone, Default)]
pub struct RepositoryResolver {
    blocked: HashSet<String>,
}

impl RepositoryResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes every location whose id or base URI matches `entry`.
    #[must_use]
    pub fn with_blocked(mut self, entry: impl Into<String>) -> Self {
        self.blocked.insert(entry.into());
        self
    }

    /// Returns the lazy, ordered candidate sequence for `repositories`.
    #[must_use]
    pub fn candidates<'a>(&'a self, repositories: &'a [RepositoryLocation]) -> Candidates<'a> {
        let mut order: Vec<usize> = (0..repositories.len()).collect();
        // Stable: equal ranks keep declaration order.
        order.sort_by_key(|&i| repositories[i].rank());
        Candidates {
            resolver: self,
            repositories,
            order: order.into_iter(),
            seen: HashSet::new(),
        }
    }

    fn allows(&self, location: &RepositoryLocation) -> bool {
        location.is_enabled()
            && !self.blocked.contains(location.id())
            && !self.blocked.contains(location.base_uri())
    }
}

/// Iterator returned by [`RepositoryResolver::candidates`].
#[derive(Debug)]
pub struct Candidates<'a> {
    resolver: &'a RepositoryResolver,
    repositories: &'a [RepositoryLocation],
    order: std::vec::IntoIter<usize>,
    seen: HashSet<&'a str>,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = &'a RepositoryLocation;

    fn next(&mut self) -> Option<Self::Item> {
        for index in self.order.by_ref() {
            let location = &self.repositories[index];
            if !self.resolver.allows(location) {
                continue;
            }
            if self.seen.insert(location.base_uri()) {
                return Some(location);
            }
        }
        None
    }
}
