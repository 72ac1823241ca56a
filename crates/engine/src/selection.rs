//! Router selection generations.
//!
//! Every router selection gets a fresh [`SelectionToken`]. Requests issued
//! under a selection carry its generation; a completion whose generation no
//! longer matches the active token is stale and must be discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bfc_model::RouterId;
use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for router selections.
#[derive(Debug, Default, Clone)]
pub struct SelectionClock {
	next: Arc<AtomicU64>,
}

impl SelectionClock {
	/// Creates a clock whose first generation is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new selection of `router`.
	pub fn select(&self, router: RouterId) -> SelectionToken {
		let generation = self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
		SelectionToken {
			router,
			generation,
			cancel: CancellationToken::new(),
		}
	}
}

/// Identity and cancellation scope of one router selection.
#[derive(Debug, Clone)]
pub struct SelectionToken {
	router: RouterId,
	generation: u64,
	cancel: CancellationToken,
}

impl SelectionToken {
	pub const fn router(&self) -> RouterId {
		self.router
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when a completion tagged `generation` belongs to this selection.
	pub const fn matches(&self, generation: u64) -> bool {
		self.generation == generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Cancels every task spawned under this selection.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Child token in the same generation, cancelled with its parent.
	pub fn child(&self) -> Self {
		Self {
			router: self.router,
			generation: self.generation,
			cancel: self.cancel.child_token(),
		}
	}
}
