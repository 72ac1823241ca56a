//! Data model shared by the routing-matrix client.
//!
//! Everything here is plain data: typed identifiers, the per-router catalogs
//! (levels, sources, destinations), the table lines a snapshot fetch returns,
//! the per-column valid-source sets, and the payloads exchanged with the
//! backend. None of it performs I/O.

/// Level, source, destination and router catalog records.
pub mod catalog;
/// Typed identifiers and crosspoint keys.
pub mod ids;
/// Routing-matrix rows and their crosspoints.
pub mod table;
/// Per-column candidate sources.
pub mod valid;
/// Push updates and commit requests.
pub mod wire;

pub use catalog::{Destination, Level, RouterCatalog, RouterSummary, Source};
pub use ids::{CrosspointKey, DestinationId, LevelId, RouterId, SourceId, SourceLevel};
pub use table::{Crosspoint, RouterTableLine};
pub use valid::{AlternateLevels, ValidSource, ValidSourceSet};
pub use wire::{CommitRequest, CrosspointUpdate, LockToggleRequest};
