//! Reduce a package's version rows to a single winning row per feed

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::feed::types::{FeedRow, PackageId};

/// A row may feed the packages feed once it has a resolved package name
pub fn is_package_eligible(row: &FeedRow) -> bool {
    row.version.resolved_name().is_some()
}

/// A row may feed the releases feed if it is package-eligible and tagged
pub fn is_release_eligible(row: &FeedRow) -> bool {
    is_package_eligible(row) && row.version.tag().is_some()
}

/// Whether `candidate` beats `current`: newer commit date, or the same
/// commit date at an earlier snapshot position.
fn wins_over(candidate: &FeedRow, current: &FeedRow) -> bool {
    (candidate.version.commit_date, std::cmp::Reverse(candidate.position))
        > (current.version.commit_date, std::cmp::Reverse(current.position))
}

/// Select the most recent eligible row of each package.
///
/// Packages without any eligible row are left out. Winners are returned in
/// snapshot position order.
pub fn latest_per_package<F>(rows: &[FeedRow], eligible: F) -> Vec<&FeedRow>
where
    F: Fn(&FeedRow) -> bool,
{
    let mut winners: HashMap<PackageId, &FeedRow> = HashMap::new();

    for row in rows.iter().filter(|row| eligible(*row)) {
        match winners.entry(row.package.id) {
            Entry::Vacant(entry) => {
                entry.insert(row);
            }
            Entry::Occupied(mut entry) => {
                if wins_over(row, entry.get()) {
                    entry.insert(row);
                }
            }
        }
    }

    let mut winners: Vec<_> = winners.into_values().collect();
    winners.sort_by_key(|row| row.position);
    winners
}
