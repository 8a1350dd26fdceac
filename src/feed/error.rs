use thiserror::Error;

use crate::catalog::error::CatalogError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Unrecognized release filter token: {0:?}")]
    UnrecognizedFilterToken(String),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Snapshot refresh failed: {0}")]
    Failed(#[from] CatalogError),

    #[error("Refresh task aborted: {0}")]
    Aborted(String),
}
