//! Generation-tagged snapshots and the feeds served from them
//!
//! A [`Feeds`] value owns the most recently loaded [`Snapshot`]. Refreshing
//! loads a complete new row set from its [`SnapshotSource`] and swaps it in
//! as a whole, so readers always see either the old or the new snapshot.
//! A failed refresh leaves the previous snapshot in place.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, error, info};

use crate::catalog::error::CatalogError;
use crate::feed::error::RefreshError;
use crate::feed::filter::ReleaseFilter;
use crate::feed::recent;
use crate::feed::types::{FeedRow, RecentPackageEntry, RecentReleaseEntry};

/// Source of joined (package, repository, version) rows
#[cfg_attr(test, automock)]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Load every row, in a stable order
    fn load(&self) -> Result<Vec<FeedRow>, CatalogError>;
}

/// Immutable row set as of one refresh
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
    rows: Vec<FeedRow>,
}

impl Snapshot {
    /// Build a snapshot, numbering rows by their position in `rows`
    pub fn new(generation: u64, refreshed_at: DateTime<Utc>, mut rows: Vec<FeedRow>) -> Self {
        for (position, row) in rows.iter_mut().enumerate() {
            row.position = position;
        }

        Self {
            generation,
            refreshed_at: Some(refreshed_at),
            rows,
        }
    }

    /// Number of successful refreshes this snapshot descends from (0 = never refreshed)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn rows(&self) -> &[FeedRow] {
        &self.rows
    }

    pub fn recent_packages(&self, limit: usize) -> Vec<RecentPackageEntry> {
        recent::recent_packages(&self.rows, limit)
    }

    pub fn recent_releases(
        &self,
        limit: usize,
        filter: &ReleaseFilter,
    ) -> Vec<RecentReleaseEntry> {
        recent::recent_releases(&self.rows, limit, filter)
    }
}

/// Recent packages and releases feeds over a refreshable snapshot
pub struct Feeds<S> {
    source: S,
    current: RwLock<Arc<Snapshot>>,
    /// Serializes refreshes so generations follow load order
    refreshing: Mutex<()>,
}

impl<S: SnapshotSource> Feeds<S> {
    /// Create feeds with an empty snapshot. Nothing is loaded until [`Feeds::refresh`].
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(Snapshot::default())),
            refreshing: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        // A poisoned lock still holds a complete snapshot; only the pointer is ever written
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Reload rows from the source and publish them as a new snapshot.
    ///
    /// Returns the generation of the published snapshot. On failure the
    /// previous snapshot keeps being served. Concurrent calls run one at a
    /// time; readers are never blocked by a load in progress.
    pub fn refresh(&self) -> Result<u64, RefreshError> {
        let _refreshing = self.refreshing.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("Refreshing feed snapshot");

        let rows = self.source.load().inspect_err(|e| {
            error!("Failed to load snapshot rows: {}", e);
        })?;
        let row_count = rows.len();

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = current.generation + 1;
        *current = Arc::new(Snapshot::new(generation, Utc::now(), rows));

        info!(
            "Published snapshot generation {} with {} rows",
            generation, row_count
        );
        Ok(generation)
    }

    pub fn recent_packages(&self, limit: usize) -> Vec<RecentPackageEntry> {
        self.snapshot().recent_packages(limit)
    }

    pub fn recent_releases(
        &self,
        limit: usize,
        filter: &ReleaseFilter,
    ) -> Vec<RecentReleaseEntry> {
        self.snapshot().recent_releases(limit, filter)
    }
}
