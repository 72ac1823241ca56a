//! Commit Submitter: turns pending edits and lock selections into requests.
//!
//! Building requests is pure ([`commit_requests`], [`lock_requests`]);
//! [`CommitSubmitter`] spawns one independent task per request and reports
//! each result on a channel, tagged with the selection generation it was
//! issued under. Nothing here mutates the pending set: entries leave it only
//! when a push update confirms them.

use std::ops::RangeInclusive;
use std::sync::Arc;

use bfc_model::{CommitRequest, CrosspointKey, DestinationId, LevelId, LockToggleRequest, RouterCatalog, RouterId};
use tokio::sync::mpsc;

use crate::pending::PendingChangeSet;
use crate::selection::SelectionToken;
use crate::snapshot::TableSnapshot;
use crate::transport::{Transport, TransportError};

/// Rectangular cell selection: display rows by level columns, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSelection {
	pub from_row: usize,
	pub to_row: usize,
	pub from_level: LevelId,
	pub to_level: LevelId,
}

impl CellSelection {
	pub fn new(from_row: usize, to_row: usize, from_level: LevelId, to_level: LevelId) -> Self {
		Self {
			from_row,
			to_row,
			from_level,
			to_level,
		}
	}

	/// Single-cell selection.
	pub fn cell(row: usize, level: LevelId) -> Self {
		Self::new(row, row, level, level)
	}

	/// Selected display rows, lowest first.
	pub fn rows(&self) -> RangeInclusive<usize> {
		self.from_row.min(self.to_row)..=self.from_row.max(self.to_row)
	}

	/// Selected levels, lowest first. Level 0 is not a column and is excluded.
	pub fn levels(&self) -> impl Iterator<Item = LevelId> {
		let low = self.from_level.get().min(self.to_level.get()).max(1);
		let high = self.from_level.get().max(self.to_level.get());
		(low..=high).map(LevelId)
	}
}

/// One commit request per pending entry, in pending order.
pub fn commit_requests(router: RouterId, pending: &PendingChangeSet) -> Vec<CommitRequest> {
	pending
		.iter()
		.map(|change| CommitRequest {
			router_id: router,
			destination_id: change.key.destination,
			destination_level_id: change.key.level,
			source_id: change.value.source,
			source_level_id: change.value.level,
		})
		.collect()
}

/// Lock requests for every addressable cell of `selection`.
///
/// `rows` maps display rows to destinations. Each request asks for the
/// inverse of the cell's last known lock flag; a crosspoint missing from the
/// snapshot counts as unlocked. Rows outside `rows`, rows mapped to
/// [`DestinationId::NONE`] and levels the destination does not carry are
/// skipped.
pub fn lock_requests(
	router: RouterId,
	selection: CellSelection,
	rows: &[DestinationId],
	catalog: &RouterCatalog,
	snapshot: &TableSnapshot,
) -> Vec<LockToggleRequest> {
	let mut requests = Vec::new();
	for row in selection.rows() {
		let Some(&destination) = rows.get(row) else {
			continue;
		};
		if destination.is_none() {
			continue;
		}
		for level in selection.levels() {
			if !catalog.supports(destination, level) {
				continue;
			}
			let locked = snapshot.crosspoint(CrosspointKey::new(destination, level)).is_some_and(|xpt| xpt.locked);
			requests.push(LockToggleRequest {
				router_id: router,
				destination_id: destination,
				destination_level_id: level,
				locked: !locked,
			});
		}
	}
	requests
}

/// Result of one submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
	Commit {
		request: CommitRequest,
		result: Result<(), TransportError>,
	},
	LockToggle {
		request: LockToggleRequest,
		result: Result<(), TransportError>,
	},
}

impl SubmitOutcome {
	pub fn key(&self) -> CrosspointKey {
		match self {
			Self::Commit { request, .. } => request.key(),
			Self::LockToggle { request, .. } => request.key(),
		}
	}

	pub fn is_ok(&self) -> bool {
		match self {
			Self::Commit { result, .. } | Self::LockToggle { result, .. } => result.is_ok(),
		}
	}
}

/// A [`SubmitOutcome`] tagged with the selection it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
	pub generation: u64,
	pub outcome: SubmitOutcome,
}

/// Issues commit and lock requests for one router selection.
pub struct CommitSubmitter {
	transport: Arc<dyn Transport>,
	token: SelectionToken,
	reports: mpsc::UnboundedSender<SubmitReport>,
}

impl CommitSubmitter {
	pub fn new(transport: Arc<dyn Transport>, token: SelectionToken, reports: mpsc::UnboundedSender<SubmitReport>) -> Self {
		Self { transport, token, reports }
	}

	pub fn router(&self) -> RouterId {
		self.token.router()
	}

	/// Submits every pending entry. Returns the number of requests issued.
	pub fn take(&self, pending: &PendingChangeSet) -> usize {
		let requests = commit_requests(self.router(), pending);
		tracing::debug!(router = %self.router(), count = requests.len(), "submitting pending edits");
		for request in &requests {
			let request = *request;
			self.spawn(move |transport| async move {
				SubmitOutcome::Commit {
					request,
					result: transport.submit_commit(request).await,
				}
			});
		}
		requests.len()
	}

	/// Flips the lock state of every addressable cell in `selection`.
	///
	/// Returns the number of requests issued.
	pub fn toggle_lock_range(&self, selection: CellSelection, rows: &[DestinationId], catalog: &RouterCatalog, snapshot: &TableSnapshot) -> usize {
		let requests = lock_requests(self.router(), selection, rows, catalog, snapshot);
		tracing::debug!(router = %self.router(), count = requests.len(), "submitting lock toggles");
		for request in &requests {
			let request = *request;
			self.spawn(move |transport| async move {
				SubmitOutcome::LockToggle {
					request,
					result: transport.submit_lock_toggle(request).await,
				}
			});
		}
		requests.len()
	}

	fn spawn<F, Fut>(&self, submit: F)
	where
		F: FnOnce(Arc<dyn Transport>) -> Fut,
		Fut: Future<Output = SubmitOutcome> + Send + 'static,
	{
		let request = submit(Arc::clone(&self.transport));
		let token = self.token.child();
		let reports = self.reports.clone();
		tokio::spawn(async move {
			let outcome = tokio::select! {
				biased;
				_ = token.cancelled() => return,
				outcome = request => outcome,
			};
			let _ = reports.send(SubmitReport {
				generation: token.generation(),
				outcome,
			});
		});
	}
}
