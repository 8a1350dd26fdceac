//! Recent activity feeds over a package catalog snapshot
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Snapshot   │────▶│    Dedup    │────▶│   Filter    │────▶│    Rank     │
//! │  (rows)     │     │ (per pkg)   │     │(releases)   │     │(recency,lim)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │  Classify   │
//!                                         │(major,minor)│
//!                                         └─────────────┘
//! ```
//!
//! The packages feed skips the filter stage.
//!
//! # Modules
//!
//! - [`types`]: Row and entry types
//! - [`classify`]: Release kind of a version tag
//! - [`filter`]: Release filter and its parse policy
//! - [`dedup`]: One winning row per package
//! - [`rank`]: Recency ordering and limiting
//! - [`recent`]: Feed assembly
//! - [`snapshot`]: Refreshable snapshots and the [`snapshot::Feeds`] facade
//! - [`error`]: Error types for filtering and refresh

pub mod classify;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod rank;
pub mod recent;
pub mod snapshot;
pub mod types;
