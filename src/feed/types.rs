//! Row and entry types shared by the feed pipeline

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Identifier of a package in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageId(pub i64);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A package as registered in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRow {
    pub id: PackageId,
    /// Source URL the package was registered with
    pub url: String,
    /// Optional ranking score
    pub score: Option<i64>,
}

/// The repository owning a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRow {
    pub owner: String,
    pub name: String,
    pub summary: Option<String>,
}

/// A semantic version tag (e.g. `1.2.3`, `3.2.1-b1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Prerelease label without the leading `-`. Never `Some("")`.
    pub pre: Option<String>,
}

impl Tag {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        let pre = pre.into();
        self.pre = (!pre.is_empty()).then_some(pre);
        self
    }

    /// Parse a tag name into a semantic version.
    ///
    /// Accepts an optional `v` prefix and partial versions:
    /// - "v1.2.3" -> 1.2.3
    /// - "1.2" -> 1.2.0
    /// - "3.2.1-b1" -> 3.2.1 with prerelease "b1"
    ///
    /// Build metadata is dropped.
    pub fn parse(tag: &str) -> Option<Self> {
        let trimmed = tag.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        // Pad only the numeric core so "1.2-b1" is not mangled into "1.2-b1.0"
        let (core, rest) = match trimmed.find(['-', '+']) {
            Some(idx) => trimmed.split_at(idx),
            None => (trimmed, ""),
        };
        let normalized = match core.split('.').count() {
            1 => format!("{core}.0.0{rest}"),
            2 => format!("{core}.0{rest}"),
            _ => trimmed.to_string(),
        };

        let version = semver::Version::parse(&normalized).ok()?;
        Some(
            Self::new(version.major, version.minor, version.patch)
                .with_pre(version.pre.as_str()),
        )
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Git reference a version was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Branch(String),
    Tag(Tag),
}

impl Reference {
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Reference::Tag(tag) => Some(tag),
            Reference::Branch(_) => None,
        }
    }
}

/// A single version of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRow {
    /// Commit or release timestamp
    pub commit_date: DateTime<Utc>,
    /// Resolved package name. Versions without one are excluded from every feed.
    pub package_name: Option<String>,
    pub reference: Option<Reference>,
    /// URL of the release or branch page
    pub url: String,
}

impl VersionRow {
    /// Resolved, non-empty package name
    pub fn resolved_name(&self) -> Option<&str> {
        self.package_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.reference.as_ref().and_then(Reference::as_tag)
    }
}

/// One joined (package, repository, version) record of a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRow {
    /// Position in the snapshot, used as the secondary ordering key
    pub position: usize,
    pub package: PackageRow,
    pub repository: RepositoryRow,
    pub version: VersionRow,
}

/// Entry of the recently active packages feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPackageEntry {
    pub package_id: PackageId,
    pub package_name: String,
    pub package_summary: Option<String>,
    pub package_url: String,
    pub activity_at: DateTime<Utc>,
}

/// Entry of the recent releases feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentReleaseEntry {
    pub package_id: PackageId,
    pub repository_owner: String,
    pub repository_name: String,
    pub package_name: String,
    pub package_summary: Option<String>,
    pub version: Tag,
    pub released_at: DateTime<Utc>,
    pub release_url: String,
}
