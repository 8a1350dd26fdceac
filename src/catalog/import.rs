//! Import of catalog documents
//!
//! A catalog document lists packages with their repository and versions:
//!
//! ```json
//! {
//!   "packages": [{
//!     "url": "https://github.com/foo/bar.git",
//!     "score": 12,
//!     "repository": { "owner": "foo", "name": "bar", "summary": "Bar" },
//!     "versions": [{
//!       "commitDate": "2021-03-01T12:00:00Z",
//!       "packageName": "Bar",
//!       "reference": { "tag": "1.2.3" },
//!       "url": "https://github.com/foo/bar/releases/tag/1.2.3"
//!     }]
//!   }]
//! }
//! ```
//!
//! Importing a package replaces all of its versions in one transaction.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::error::CatalogError;
use crate::catalog::store::Catalog;
use crate::feed::types::{Reference, RepositoryRow, Tag, VersionRow};

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CatalogFile {
    pub packages: Vec<PackageRecord>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PackageRecord {
    pub url: String,
    #[serde(default)]
    pub score: Option<i64>,
    pub repository: Option<RepositoryRecord>,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RepositoryRecord {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub commit_date: DateTime<Utc>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub reference: Option<ReferenceRecord>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceRecord {
    Branch(String),
    Tag(String),
}

/// Counts of what an import wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub packages: usize,
    pub versions: usize,
    /// Versions dropped because their tag could not be parsed
    pub skipped_versions: usize,
}

impl ReferenceRecord {
    fn to_reference(&self) -> Option<Reference> {
        match self {
            ReferenceRecord::Branch(name) => Some(Reference::Branch(name.clone())),
            ReferenceRecord::Tag(tag) => Tag::parse(tag).map(Reference::Tag),
        }
    }
}

/// Write every package of `file` into the catalog
pub fn import_catalog(
    catalog: &Catalog,
    file: &CatalogFile,
) -> Result<ImportSummary, CatalogError> {
    let mut summary = ImportSummary::default();

    for record in &file.packages {
        let package = catalog.upsert_package(&record.url, record.score)?;

        if let Some(repository) = &record.repository {
            catalog.set_repository(
                package,
                &RepositoryRow {
                    owner: repository.owner.clone(),
                    name: repository.name.clone(),
                    summary: repository.summary.clone(),
                },
            )?;
        }

        let mut versions = Vec::with_capacity(record.versions.len());
        for version in &record.versions {
            let reference = match &version.reference {
                None => None,
                Some(reference) => match reference.to_reference() {
                    Some(reference) => Some(reference),
                    None => {
                        warn!(
                            "Skipping version of {} with unparseable reference {:?}",
                            record.url, reference
                        );
                        summary.skipped_versions += 1;
                        continue;
                    }
                },
            };

            versions.push(VersionRow {
                commit_date: version.commit_date,
                package_name: version.package_name.clone(),
                reference,
                url: version.url.clone(),
            });
        }

        catalog.replace_versions(package, &versions)?;
        summary.versions += versions.len();
        summary.packages += 1;
    }

    info!(
        "Imported {} packages with {} versions ({} skipped)",
        summary.packages, summary.versions, summary.skipped_versions
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_catalog() -> (TempDir, Catalog) {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Catalog::new(&temp_dir.path().join("test.db")).unwrap();
        (temp_dir, catalog)
    }

    fn catalog_file() -> CatalogFile {
        serde_json::from_value(json!({
            "packages": [{
                "url": "https://github.com/foo/bar.git",
                "score": 7,
                "repository": { "owner": "foo", "name": "bar", "summary": "pkg bar" },
                "versions": [
                    {
                        "commitDate": "1970-01-01T00:00:00Z",
                        "packageName": "Bar",
                        "reference": { "tag": "v1.0.0" },
                        "url": "foo/bar/1.0.0"
                    },
                    {
                        "commitDate": "1970-01-01T00:00:01Z",
                        "packageName": "Bar",
                        "reference": { "branch": "main" },
                        "url": "foo/bar/main"
                    },
                    {
                        "commitDate": "1970-01-01T00:00:02Z",
                        "reference": { "tag": "not a version" },
                        "url": "foo/bar/broken"
                    }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn catalog_file_parses_references() {
        let file = catalog_file();
        let versions = &file.packages[0].versions;

        assert_eq!(
            versions[0].reference,
            Some(ReferenceRecord::Tag("v1.0.0".to_string()))
        );
        assert_eq!(
            versions[1].reference,
            Some(ReferenceRecord::Branch("main".to_string()))
        );
        assert_eq!(versions[2].package_name, None);
    }

    #[test]
    fn catalog_file_defaults_missing_fields() {
        let file: CatalogFile =
            serde_json::from_value(json!({ "packages": [{ "url": "x" }] })).unwrap();

        assert_eq!(
            file.packages[0],
            PackageRecord {
                url: "x".to_string(),
                score: None,
                repository: None,
                versions: vec![],
            }
        );
    }

    #[test]
    fn import_catalog_writes_rows_and_skips_unparseable_tags() {
        let (_temp_dir, catalog) = create_test_catalog();

        let summary = import_catalog(&catalog, &catalog_file()).unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                packages: 1,
                versions: 2,
                skipped_versions: 1,
            }
        );

        let rows = catalog.load_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].version.tag(), Some(&Tag::new(1, 0, 0)));
        assert_eq!(
            rows[1].version.reference,
            Some(Reference::Branch("main".to_string()))
        );
        assert_eq!(rows[0].package.score, Some(7));
    }

    #[test]
    fn import_catalog_twice_replaces_versions() {
        let (_temp_dir, catalog) = create_test_catalog();

        import_catalog(&catalog, &catalog_file()).unwrap();
        import_catalog(&catalog, &catalog_file()).unwrap();

        assert_eq!(catalog.load_rows().unwrap().len(), 2);
    }

    #[test]
    fn import_catalog_failure_keeps_previously_imported_versions() {
        let (_temp_dir, catalog) = create_test_catalog();
        import_catalog(&catalog, &catalog_file()).unwrap();

        let broken: CatalogFile = serde_json::from_value(json!({
            "packages": [{
                "url": "https://github.com/foo/bar.git",
                "versions": [
                    {
                        "commitDate": "1970-01-01T00:00:05Z",
                        "packageName": "Bar",
                        "reference": { "tag": "2.0.0" },
                        "url": "foo/bar/2.0.0"
                    },
                    {
                        "commitDate": "3000-01-01T00:00:00Z",
                        "packageName": "Bar",
                        "url": "foo/bar/far-future"
                    }
                ]
            }]
        }))
        .unwrap();

        let result = import_catalog(&catalog, &broken);

        assert!(matches!(result, Err(CatalogError::CommitDateOutOfRange(_))));
        let rows = catalog.load_rows().unwrap();
        assert_eq!(
            rows.iter().map(|r| r.version.url.as_str()).collect::<Vec<_>>(),
            vec!["foo/bar/1.0.0", "foo/bar/main"]
        );
    }
}
