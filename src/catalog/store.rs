use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::catalog::error::CatalogError;
use crate::feed::snapshot::SnapshotSource;
use crate::feed::types::{
    FeedRow, PackageId, PackageRow, Reference, RepositoryRow, Tag, VersionRow,
};

/// Schema migrations.
/// Each version contains a list of SQL statements to execute.
/// Version 0 is the base schema created by `create_schema`.
const MIGRATIONS: &[&[&str]] = &[];

const REFERENCE_BRANCH: &str = "branch";
const REFERENCE_TAG: &str = "tag";

/// SQLite-backed package catalog
pub struct Catalog {
    conn: Mutex<Connection>,
}

/// Columns of one joined row, before validation
struct RawRow {
    package_id: i64,
    package_url: String,
    score: Option<i64>,
    owner: String,
    repository_name: String,
    summary: Option<String>,
    version_id: i64,
    commit_date: i64,
    package_name: Option<String>,
    reference_kind: Option<String>,
    reference: Option<String>,
    version_url: String,
}

impl RawRow {
    fn into_feed_row(self, position: usize) -> Result<FeedRow, CatalogError> {
        let version_id = self.version_id;
        let invalid = |reason: String| CatalogError::InvalidRow { version_id, reason };

        let commit_date = DateTime::from_timestamp_nanos(self.commit_date);

        let reference = match (self.reference_kind.as_deref(), self.reference) {
            (None, _) => None,
            (Some(REFERENCE_BRANCH), Some(name)) => Some(Reference::Branch(name)),
            (Some(REFERENCE_TAG), Some(tag)) => Some(Reference::Tag(
                Tag::parse(&tag).ok_or_else(|| invalid(format!("unparseable tag {tag:?}")))?,
            )),
            (Some(kind), _) => return Err(invalid(format!("malformed {kind} reference"))),
        };

        Ok(FeedRow {
            position,
            package: PackageRow {
                id: PackageId(self.package_id),
                url: self.package_url,
                score: self.score,
            },
            repository: RepositoryRow {
                owner: self.owner,
                name: self.repository_name,
                summary: self.summary,
            },
            version: VersionRow {
                commit_date,
                package_name: self.package_name,
                reference,
                url: self.version_url,
            },
        })
    }
}

fn encode_reference(reference: Option<&Reference>) -> (Option<&'static str>, Option<String>) {
    match reference {
        None => (None, None),
        Some(Reference::Branch(name)) => (Some(REFERENCE_BRANCH), Some(name.clone())),
        Some(Reference::Tag(tag)) => (Some(REFERENCE_TAG), Some(tag.to_string())),
    }
}

impl Catalog {
    pub fn new(db_path: &Path) -> Result<Self, CatalogError> {
        info!("Opening catalog database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode so readers are not blocked while the catalog is updated
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        let catalog = Self {
            conn: Mutex::new(conn),
        };

        catalog.create_schema()?;
        info!("Catalog initialized successfully");

        Ok(catalog)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CatalogError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                score INTEGER
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL UNIQUE,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                summary TEXT,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                -- nanoseconds since the Unix epoch
                commit_date INTEGER NOT NULL,
                package_name TEXT,
                reference_kind TEXT,
                reference TEXT,
                url TEXT NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_versions_package_date ON versions(package_id, commit_date)",
            [],
        )?;

        // Apply migrations
        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CatalogError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Register a package by URL, updating its score if it already exists
    pub fn upsert_package(
        &self,
        url: &str,
        score: Option<i64>,
    ) -> Result<PackageId, CatalogError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO packages (url, score)
            VALUES (?1, ?2)
            ON CONFLICT(url) DO UPDATE SET score = excluded.score
            "#,
            (url, score),
        )?;

        let id: i64 = conn.query_row("SELECT id FROM packages WHERE url = ?1", [url], |row| {
            row.get(0)
        })?;

        Ok(PackageId(id))
    }

    fn ensure_package(conn: &Connection, package: PackageId) -> Result<(), CatalogError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM packages WHERE id = ?1)",
            [package.0],
            |row| row.get(0),
        )?;

        if exists {
            Ok(())
        } else {
            Err(CatalogError::UnknownPackage(package.to_string()))
        }
    }

    /// Set the repository of a package, replacing any previous one
    pub fn set_repository(
        &self,
        package: PackageId,
        repository: &RepositoryRow,
    ) -> Result<(), CatalogError> {
        let conn = self.lock_conn()?;
        Self::ensure_package(&conn, package)?;

        conn.execute(
            r#"
            INSERT INTO repositories (package_id, owner, name, summary)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(package_id) DO UPDATE SET
                owner = excluded.owner,
                name = excluded.name,
                summary = excluded.summary
            "#,
            (
                package.0,
                &repository.owner,
                &repository.name,
                &repository.summary,
            ),
        )?;

        Ok(())
    }

    fn insert_version(
        conn: &Connection,
        package: PackageId,
        version: &VersionRow,
    ) -> Result<i64, CatalogError> {
        let commit_date = version
            .commit_date
            .timestamp_nanos_opt()
            .ok_or(CatalogError::CommitDateOutOfRange(version.commit_date))?;
        let (reference_kind, reference) = encode_reference(version.reference.as_ref());

        conn.execute(
            r#"
            INSERT INTO versions (package_id, commit_date, package_name, reference_kind, reference, url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            (
                package.0,
                commit_date,
                &version.package_name,
                reference_kind,
                reference,
                &version.url,
            ),
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Append a version to a package. Returns the version's row id.
    pub fn add_version(
        &self,
        package: PackageId,
        version: &VersionRow,
    ) -> Result<i64, CatalogError> {
        let conn = self.lock_conn()?;
        Self::ensure_package(&conn, package)?;
        Self::insert_version(&conn, package, version)
    }

    /// Replace every version of a package in a single transaction.
    /// Returns the number of versions removed.
    ///
    /// Readers see either the old or the new version set, and a failed
    /// insert leaves the old set in place.
    pub fn replace_versions(
        &self,
        package: PackageId,
        versions: &[VersionRow],
    ) -> Result<usize, CatalogError> {
        let mut conn = self.lock_conn()?;
        Self::ensure_package(&conn, package)?;

        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM versions WHERE package_id = ?1", [package.0])?;
        for version in versions {
            Self::insert_version(&tx, package, version)?;
        }
        tx.commit()?;

        debug!(
            "Replaced {} versions of package {} with {}",
            removed,
            package,
            versions.len()
        );
        Ok(removed)
    }

    /// Look up a package id by URL
    pub fn find_package(&self, url: &str) -> Result<Option<PackageId>, CatalogError> {
        let conn = self.lock_conn()?;
        let id = conn
            .query_row("SELECT id FROM packages WHERE url = ?1", [url], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(id.map(PackageId))
    }

    /// Load every joined (package, repository, version) row in insertion order.
    ///
    /// Packages without a repository are not part of the result.
    pub fn load_rows(&self) -> Result<Vec<FeedRow>, CatalogError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.id, p.url, p.score, r.owner, r.name, r.summary,
                   v.id, v.commit_date, v.package_name, v.reference_kind, v.reference, v.url
            FROM versions v
            JOIN packages p ON v.package_id = p.id
            JOIN repositories r ON r.package_id = p.id
            ORDER BY v.id
            "#,
        )?;

        let raw_rows = stmt
            .query_map([], |row| {
                Ok(RawRow {
                    package_id: row.get(0)?,
                    package_url: row.get(1)?,
                    score: row.get(2)?,
                    owner: row.get(3)?,
                    repository_name: row.get(4)?,
                    summary: row.get(5)?,
                    version_id: row.get(6)?,
                    commit_date: row.get(7)?,
                    package_name: row.get(8)?,
                    reference_kind: row.get(9)?,
                    reference: row.get(10)?,
                    version_url: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let rows = raw_rows
            .into_iter()
            .enumerate()
            .map(|(position, raw)| raw.into_feed_row(position))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Loaded {} catalog rows", rows.len());
        Ok(rows)
    }
}

impl SnapshotSource for Catalog {
    fn load(&self) -> Result<Vec<FeedRow>, CatalogError> {
        self.load_rows()
    }
}
