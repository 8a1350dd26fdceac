//! Release filter: a composable selector over release kinds

use std::fmt;
use std::ops::BitOr;

use serde::Deserialize;

use crate::feed::classify::{ReleaseKind, classify};
use crate::feed::error::FeedError;
use crate::feed::types::RecentReleaseEntry;

/// How unrecognized filter tokens are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterPolicy {
    /// Unrecognized tokens select every release kind
    #[default]
    FallbackToAll,
    /// Unrecognized tokens are reported as errors
    Reject,
}

/// Set of release kinds to include in the releases feed.
///
/// An empty set selects everything, so a filter built from no flags at all
/// behaves exactly like [`ReleaseFilter::ALL`].
#[derive(Clone, Copy, Default)]
pub struct ReleaseFilter {
    bits: u8,
}

impl ReleaseFilter {
    pub const NONE: ReleaseFilter = ReleaseFilter { bits: 0 };
    pub const MAJOR: ReleaseFilter = ReleaseFilter::only(ReleaseKind::Major);
    pub const MINOR: ReleaseFilter = ReleaseFilter::only(ReleaseKind::Minor);
    pub const PATCH: ReleaseFilter = ReleaseFilter::only(ReleaseKind::Patch);
    pub const PRE: ReleaseFilter = ReleaseFilter::only(ReleaseKind::Pre);
    pub const ALL: ReleaseFilter = ReleaseFilter { bits: 0b1111 };

    const fn bit(kind: ReleaseKind) -> u8 {
        match kind {
            ReleaseKind::Major => 0b0001,
            ReleaseKind::Minor => 0b0010,
            ReleaseKind::Patch => 0b0100,
            ReleaseKind::Pre => 0b1000,
        }
    }

    /// Filter selecting a single kind
    pub const fn only(kind: ReleaseKind) -> Self {
        Self {
            bits: Self::bit(kind),
        }
    }

    /// Build a filter from routing-layer boolean query flags.
    /// No flag set selects everything.
    pub fn from_flags(major: bool, minor: bool, patch: bool, pre: bool) -> Self {
        [
            (major, ReleaseKind::Major),
            (minor, ReleaseKind::Minor),
            (patch, ReleaseKind::Patch),
            (pre, ReleaseKind::Pre),
        ]
        .into_iter()
        .filter_map(|(set, kind)| set.then_some(kind))
        .collect()
    }

    /// Parse a single filter token (`major`, `minor`, `patch` or `pre`).
    ///
    /// Anything else yields [`ReleaseFilter::ALL`] under
    /// [`FilterPolicy::FallbackToAll`] and an error under [`FilterPolicy::Reject`].
    pub fn parse(token: &str, policy: FilterPolicy) -> Result<Self, FeedError> {
        match (token.parse::<ReleaseKind>(), policy) {
            (Ok(kind), _) => Ok(Self::only(kind)),
            (Err(()), FilterPolicy::FallbackToAll) => Ok(Self::ALL),
            (Err(()), FilterPolicy::Reject) => {
                Err(FeedError::UnrecognizedFilterToken(token.to_string()))
            }
        }
    }

    /// Parse and union several tokens
    pub fn parse_all<'a, I>(tokens: I, policy: FilterPolicy) -> Result<Self, FeedError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens
            .into_iter()
            .try_fold(Self::NONE, |acc, token| -> Result<Self, FeedError> {
                Ok(acc | Self::parse(token, policy)?)
            })
    }

    pub fn insert(&mut self, kind: ReleaseKind) {
        self.bits |= Self::bit(kind);
    }

    /// Whether no kind was explicitly selected
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Bits in effect, with the empty set widened to all kinds
    fn effective_bits(&self) -> u8 {
        if self.is_empty() { Self::ALL.bits } else { self.bits }
    }

    pub fn contains(&self, kind: ReleaseKind) -> bool {
        self.effective_bits() & Self::bit(kind) != 0
    }

    /// Kinds selected by this filter
    pub fn kinds(&self) -> impl Iterator<Item = ReleaseKind> + '_ {
        ReleaseKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl PartialEq for ReleaseFilter {
    fn eq(&self, other: &Self) -> bool {
        self.effective_bits() == other.effective_bits()
    }
}

impl Eq for ReleaseFilter {}

impl fmt::Debug for ReleaseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

impl BitOr for ReleaseFilter {
    type Output = ReleaseFilter;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl From<ReleaseKind> for ReleaseFilter {
    fn from(kind: ReleaseKind) -> Self {
        Self::only(kind)
    }
}

impl FromIterator<ReleaseKind> for ReleaseFilter {
    fn from_iter<T: IntoIterator<Item = ReleaseKind>>(iter: T) -> Self {
        let mut filter = Self::NONE;
        for kind in iter {
            filter.insert(kind);
        }
        filter
    }
}

/// Keep the releases whose version is of a selected kind, preserving order
pub fn filter_releases(
    releases: Vec<RecentReleaseEntry>,
    filter: &ReleaseFilter,
) -> Vec<RecentReleaseEntry> {
    releases
        .into_iter()
        .filter(|release| filter.contains(classify(&release.version)))
        .collect()
}
