//! Crosspoint state reconciliation for routing-matrix clients.
//!
//! A view shows the routing matrix of one selected router. Its state is the
//! authoritative [`TableSnapshot`] (filled by a fetch, then patched by push
//! updates) plus the operator's unconfirmed edits in a [`PendingChangeSet`].
//! The display is the snapshot overlaid with those edits and lock flags.
//!
//! Pure state lives in [`Reconciler`]; [`open_view`] runs it inside a single
//! tokio task that talks to a [`Transport`] and paints through a
//! [`DisplaySink`].

/// Valid-source lookup for operator edits.
pub mod candidates;
/// Repaint debouncing.
pub mod coalesce;
/// Engine configuration.
pub mod config;
/// Async view driver and operator handle.
pub mod driver;
/// Engine error types.
pub mod error;
/// Unconfirmed operator edits.
pub mod pending;
/// Snapshot-plus-overlay display projection.
pub mod projection;
/// Per-selection reconciliation state machine.
pub mod reconciler;
/// Router selection generations.
pub mod selection;
/// Authoritative routing matrix.
pub mod snapshot;
/// Commit and lock-toggle submission.
pub mod submit;
/// Backend seam and in-memory backend.
pub mod transport;

pub use candidates::Candidates;
pub use coalesce::{CoalescerState, RenderCoalescer};
pub use config::EngineConfig;
pub use driver::{DisplaySink, Notice, ViewEvent, ViewHandle, open_view};
pub use error::{EngineError, Result};
pub use pending::{EnqueueOutcome, PendingChange, PendingChangeSet};
pub use projection::{CellOverlay, DisplayCell, DisplayMatrix, DisplayRow, RowFilter};
pub use reconciler::Reconciler;
pub use selection::{SelectionClock, SelectionToken};
pub use snapshot::TableSnapshot;
pub use submit::{CellSelection, CommitSubmitter, SubmitOutcome, SubmitReport};
pub use transport::{MemoryRouter, RouterDefinition, Transport, TransportError, UpdateStream};

#[cfg(test)]
mod tests;
