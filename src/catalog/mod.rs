//! SQLite-backed package catalog
//!
//! Stores packages, their repositories and versions, and serves the joined
//! rows the feeds are computed from.
//!
//! # Modules
//!
//! - [`store`]: Catalog database, schema migrations and snapshot loading
//! - [`import`]: Import of JSON catalog documents
//! - [`error`]: Error types for catalog operations

pub mod error;
pub mod import;
pub mod store;
