//! Error types for the reconciliation engine.

use bfc_model::{DestinationId, LevelId, RouterId};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while applying updates, edits and commits.
///
/// None of these is fatal to a view; the worst outcome is a stale cell until
/// the next push update or retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
	/// The destination is not part of the current snapshot.
	#[error("unknown destination {0}")]
	UnknownDestination(DestinationId),

	/// The destination's table line has no column for the level.
	#[error("unknown level {level} on destination {destination}")]
	UnknownLevel {
		/// Destination that was addressed.
		destination: DestinationId,
		/// Level without a column.
		level: LevelId,
	},

	/// A response for a router selection that is no longer active.
	#[error("stale response for router {router} (selection {generation})")]
	StaleResponse {
		/// Router the response belongs to.
		router: RouterId,
		/// Selection generation the request was issued under.
		generation: u64,
	},

	/// Operator input matching none of the column's valid sources.
	#[error("{value:?} is not a valid source for level {level}")]
	InvalidEditValue {
		/// Column the edit targeted.
		level: LevelId,
		/// Rejected input.
		value: String,
	},

	/// The destination does not carry the edited level.
	#[error("destination {destination} does not carry level {level}")]
	ReadOnlyCell {
		/// Destination that was addressed.
		destination: DestinationId,
		/// Level the destination lacks.
		level: LevelId,
	},

	/// A request to the backend failed.
	#[error("transport failure: {0}")]
	TransportFailure(#[from] TransportError),

	/// The view driver has shut down.
	#[error("view is closed")]
	ViewClosed,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
