use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid version row {version_id}: {reason}")]
    InvalidRow { version_id: i64, reason: String },

    #[error("Commit date out of storable range: {0}")]
    CommitDateOutOfRange(DateTime<Utc>),

    #[error("Unknown package: {0}")]
    UnknownPackage(String),
}
