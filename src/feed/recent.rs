//! Assembly of the recent packages and recent releases feeds

use crate::feed::dedup::{is_package_eligible, is_release_eligible, latest_per_package};
use crate::feed::filter::{ReleaseFilter, filter_releases};
use crate::feed::rank::rank;
use crate::feed::types::{FeedRow, RecentPackageEntry, RecentReleaseEntry};

fn package_entry(row: &FeedRow) -> Option<RecentPackageEntry> {
    Some(RecentPackageEntry {
        package_id: row.package.id,
        package_name: row.version.resolved_name()?.to_string(),
        package_summary: row.repository.summary.clone(),
        package_url: row.package.url.clone(),
        activity_at: row.version.commit_date,
    })
}

fn release_entry(row: &FeedRow) -> Option<RecentReleaseEntry> {
    Some(RecentReleaseEntry {
        package_id: row.package.id,
        repository_owner: row.repository.owner.clone(),
        repository_name: row.repository.name.clone(),
        package_name: row.version.resolved_name()?.to_string(),
        package_summary: row.repository.summary.clone(),
        version: row.version.tag()?.clone(),
        released_at: row.version.commit_date,
        release_url: row.version.url.clone(),
    })
}

/// Most recently active packages, one entry per package, newest first
pub fn recent_packages(rows: &[FeedRow], limit: usize) -> Vec<RecentPackageEntry> {
    let entries: Vec<_> = latest_per_package(rows, is_package_eligible)
        .into_iter()
        .filter_map(package_entry)
        .collect();

    rank(entries, limit)
}

/// Most recent tagged release of each package matching `filter`, newest first.
///
/// Filtering happens before the limit is applied.
pub fn recent_releases(
    rows: &[FeedRow],
    limit: usize,
    filter: &ReleaseFilter,
) -> Vec<RecentReleaseEntry> {
    let entries: Vec<_> = latest_per_package(rows, is_release_eligible)
        .into_iter()
        .filter_map(release_entry)
        .collect();

    rank(filter_releases(entries, filter), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::dedup::tests::{at, branch, row, tag};
    use crate::feed::types::{PackageId, Reference, Tag};

    #[test]
    fn recent_packages_skips_packages_without_a_name() {
        let rows = vec![
            row(0, 1, 0, Some("1"), None),
            row(1, 2, 1, None, None),
            row(2, 3, 2, Some("3"), None),
        ];

        let res = recent_packages(&rows, 10);

        assert_eq!(
            res.iter().map(|e| e.package_name.as_str()).collect::<Vec<_>>(),
            vec!["3", "1"]
        );
        assert_eq!(
            res.iter()
                .map(|e| e.package_summary.as_deref())
                .collect::<Vec<_>>(),
            vec![Some("pkg 3"), Some("pkg 1")]
        );
    }

    #[test]
    fn recent_packages_dedupes_to_the_latest_name() {
        let rows = vec![
            row(0, 1, 0, Some("pkg-bar"), None),
            row(1, 1, 1, Some("pkg-bar-updated"), None),
        ];

        let res = recent_packages(&rows, 10);

        assert_eq!(
            res,
            vec![RecentPackageEntry {
                package_id: PackageId(1),
                package_name: "pkg-bar-updated".to_string(),
                package_summary: Some("pkg 1".to_string()),
                package_url: "https://example.com/1.git".to_string(),
                activity_at: at(1),
            }]
        );
    }

    #[test]
    fn recent_packages_includes_branch_versions() {
        let rows = vec![row(0, 1, 0, Some("a"), branch("main"))];

        assert_eq!(recent_packages(&rows, 10).len(), 1);
        assert!(recent_releases(&rows, 10, &ReleaseFilter::ALL).is_empty());
    }

    #[test]
    fn recent_releases_selects_only_eligible_packages() {
        let rows = vec![
            row(0, 1, 0, Some("1"), tag(1, 2, 3)),
            row(1, 2, 0, Some("2"), branch("default")),
            row(2, 3, 0, None, branch("default")),
            row(3, 4, 0, Some("4"), None),
            row(4, 5, 1, Some("5"), tag(2, 0, 0)),
        ];

        let res = recent_releases(&rows, 10, &ReleaseFilter::ALL);

        assert_eq!(
            res.iter().map(|e| e.package_name.as_str()).collect::<Vec<_>>(),
            vec!["5", "1"]
        );
        assert_eq!(
            res.iter()
                .map(|e| e.version.to_string())
                .collect::<Vec<_>>(),
            vec!["2.0.0", "1.2.3"]
        );
        assert_eq!(
            res.iter().map(|e| e.release_url.as_str()).collect::<Vec<_>>(),
            vec!["5/4", "1/0"]
        );
    }

    #[test]
    fn recent_releases_dedupes_to_the_latest_tag() {
        let rows = vec![
            row(0, 1, 0, Some("pkg-bar"), tag(1, 0, 0)),
            row(1, 1, 1, Some("pkg-bar-updated"), tag(1, 0, 1)),
        ];

        let res = recent_releases(&rows, 10, &ReleaseFilter::ALL);

        assert_eq!(res.len(), 1);
        assert_eq!(res[0].package_name, "pkg-bar-updated");
        assert_eq!(res[0].version, Tag::new(1, 0, 1));
    }

    #[test]
    fn recent_releases_filters_the_winning_release_only() {
        // The latest release is a patch, so a major-only feed has nothing for this package
        let rows = vec![
            row(0, 1, 0, Some("a"), tag(2, 0, 0)),
            row(1, 1, 1, Some("a"), tag(2, 0, 1)),
        ];

        assert!(recent_releases(&rows, 10, &ReleaseFilter::MAJOR).is_empty());
        assert_eq!(recent_releases(&rows, 10, &ReleaseFilter::PATCH).len(), 1);
    }

    #[test]
    fn recent_releases_applies_limit_after_filtering() {
        let rows = vec![
            row(0, 1, 3, Some("a"), tag(1, 0, 1)),
            row(1, 2, 2, Some("b"), tag(2, 0, 0)),
            row(2, 3, 1, Some("c"), tag(3, 0, 0)),
        ];

        let res = recent_releases(&rows, 2, &ReleaseFilter::MAJOR);

        assert_eq!(
            res.iter().map(|e| e.package_name.as_str()).collect::<Vec<_>>(),
            vec!["b", "c"]
        );
    }

    #[test]
    fn recent_releases_includes_prereleases_by_default() {
        let pre = Reference::Tag(Tag::new(4, 0, 0).with_pre("b1"));
        let rows = vec![row(0, 1, 0, Some("a"), Some(pre))];

        let res = recent_releases(&rows, 10, &ReleaseFilter::NONE);

        assert_eq!(res[0].version.to_string(), "4.0.0-b1");
    }

    #[test]
    fn feeds_are_empty_for_empty_snapshot() {
        assert!(recent_packages(&[], 10).is_empty());
        assert!(recent_releases(&[], 10, &ReleaseFilter::ALL).is_empty());
    }

    #[test]
    fn recent_packages_is_deterministic() {
        let rows = vec![
            row(0, 1, 1, Some("a"), None),
            row(1, 2, 1, Some("b"), None),
            row(2, 3, 1, Some("c"), None),
        ];

        let first = recent_packages(&rows, 10);
        let second = recent_packages(&rows, 10);

        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|e| e.package_name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }
}
