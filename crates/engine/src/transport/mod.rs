//! Backend seam: request/response calls plus the push-update stream.

use async_trait::async_trait;
use bfc_model::{
	AlternateLevels, CommitRequest, CrosspointUpdate, DestinationId, LevelId, LockToggleRequest, RouterCatalog, RouterId, RouterSummary,
	RouterTableLine,
};
use thiserror::Error;
use tokio::sync::mpsc;

/// In-process backend with a broadcast push stream.
pub mod memory;

pub use memory::{MemoryRouter, RouterDefinition};

/// Receiving half of a push-update subscription.
///
/// The stream ends when the backend closes the subscription. Dropping the
/// receiver unsubscribes.
pub type UpdateStream = mpsc::UnboundedReceiver<CrosspointUpdate>;

/// Failures reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	#[error("router {0} not found")]
	RouterNotFound(RouterId),
	#[error("crosspoint {destination}/{level} is locked")]
	Locked { destination: DestinationId, level: LevelId },
	#[error("request rejected: {0}")]
	Rejected(String),
	#[error("transport closed")]
	Closed,
}

/// Access to a router backend.
///
/// Every call is independent; the engine never assumes ordering between
/// responses of concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	/// Lists the configured routers.
	async fn fetch_routers(&self) -> Result<Vec<RouterSummary>, TransportError>;

	/// Fetches levels, sources and destinations of `router`.
	async fn fetch_catalog(&self, router: RouterId) -> Result<RouterCatalog, TransportError>;

	/// Fetches the full routing matrix of `router`.
	async fn fetch_snapshot(&self, router: RouterId) -> Result<Vec<RouterTableLine>, TransportError>;

	/// Fetches the alternate-level configuration used to build candidate lists.
	async fn fetch_valid_sources(&self, router: RouterId) -> Result<Vec<AlternateLevels>, TransportError>;

	/// Opens a push-update subscription for `router`.
	async fn subscribe_updates(&self, router: RouterId) -> Result<UpdateStream, TransportError>;

	/// Routes one crosspoint. Success only means the request was accepted.
	async fn submit_commit(&self, request: CommitRequest) -> Result<(), TransportError>;

	/// Sets the lock state of one crosspoint.
	async fn submit_lock_toggle(&self, request: LockToggleRequest) -> Result<(), TransportError>;
}
