//! Recency ordering and result limiting

use chrono::{DateTime, Utc};

use crate::feed::types::{RecentPackageEntry, RecentReleaseEntry};

/// Entries that can be ordered by recency
pub trait Ranked {
    fn ranked_at(&self) -> DateTime<Utc>;
}

impl Ranked for RecentPackageEntry {
    fn ranked_at(&self) -> DateTime<Utc> {
        self.activity_at
    }
}

impl Ranked for RecentReleaseEntry {
    fn ranked_at(&self) -> DateTime<Utc> {
        self.released_at
    }
}

/// Order entries newest first and keep at most `limit` of them.
///
/// The sort is stable: entries with equal timestamps keep their incoming
/// order, which the deduplicator fixes to snapshot position order.
pub fn rank<T: Ranked>(mut entries: Vec<T>, limit: usize) -> Vec<T> {
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.ranked_at()));
    entries.truncate(limit);
    entries
}
