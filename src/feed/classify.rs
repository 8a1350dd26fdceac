//! Release classification by semantic version shape

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::feed::types::Tag;

/// Category of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    /// `x.0.0`
    Major,
    /// `x.y.0` with y > 0
    Minor,
    /// `x.y.z` with z > 0
    Patch,
    /// Any version carrying a prerelease label
    Pre,
}

impl ReleaseKind {
    pub const ALL: [ReleaseKind; 4] = [
        ReleaseKind::Major,
        ReleaseKind::Minor,
        ReleaseKind::Patch,
        ReleaseKind::Pre,
    ];

    /// Returns the query token for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseKind::Major => "major",
            ReleaseKind::Minor => "minor",
            ReleaseKind::Patch => "patch",
            ReleaseKind::Pre => "pre",
        }
    }
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(ReleaseKind::Major),
            "minor" => Ok(ReleaseKind::Minor),
            "patch" => Ok(ReleaseKind::Patch),
            "pre" => Ok(ReleaseKind::Pre),
            _ => Err(()),
        }
    }
}

/// Classify a tag. First match wins: pre, patch, minor, major.
pub fn classify(tag: &Tag) -> ReleaseKind {
    if tag.pre.as_deref().is_some_and(|pre| !pre.is_empty()) {
        ReleaseKind::Pre
    } else if tag.patch > 0 {
        ReleaseKind::Patch
    } else if tag.minor > 0 {
        ReleaseKind::Minor
    } else {
        ReleaseKind::Major
    }
}
