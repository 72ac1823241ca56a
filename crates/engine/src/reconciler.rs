//! Live Update Reconciler: per-selection state machine.
//!
//! # Mental model
//!
//! - One [`Reconciler`] exists per selected router. It owns the catalog, the
//!   [`TableSnapshot`], the [`PendingChangeSet`], the valid-source set and the
//!   view's only repaint deadline (inside its [`RenderCoalescer`]).
//! - Every input is one atomic reaction step taking `&mut self` and the
//!   current time: snapshot/catalog loads, push updates, operator edits,
//!   commit acknowledgements, filter changes. No step sleeps or spawns.
//! - The driver asks [`Reconciler::repaint_deadline`] when to wake up and
//!   calls [`Reconciler::poll_repaint`] when it does.
//!
//! # Invariants
//!
//! 1. A push update is applied to the snapshot before the pending set is
//!    reconciled against it.
//! 2. After any snapshot mutation no pending entry equals the crosspoint at
//!    its key.
//! 3. Each mutating step restarts the coalescing window; one window yields at
//!    most one projected matrix.
//! 4. Updates for unknown destinations or levels leave every piece of state
//!    untouched.

use std::time::{Duration, Instant};

use bfc_model::{CrosspointKey, CrosspointUpdate, DestinationId, LevelId, RouterCatalog, RouterId, RouterTableLine, ValidSourceSet};

use crate::candidates::Candidates;
use crate::coalesce::RenderCoalescer;
use crate::error::{EngineError, Result};
use crate::pending::{PendingChange, PendingChangeSet};
use crate::projection::{DisplayMatrix, RowFilter, project, visible_destinations};
use crate::snapshot::TableSnapshot;

/// Reconciliation state of one router selection.
#[derive(Debug, Clone)]
pub struct Reconciler {
	router: RouterId,
	catalog: Option<RouterCatalog>,
	valid: ValidSourceSet,
	snapshot: TableSnapshot,
	snapshot_loaded: bool,
	pending: PendingChangeSet,
	coalescer: RenderCoalescer,
	filter: RowFilter,
}

impl Reconciler {
	pub fn new(router: RouterId, quiet_period: Duration) -> Self {
		Self {
			router,
			catalog: None,
			valid: ValidSourceSet::default(),
			snapshot: TableSnapshot::new(),
			snapshot_loaded: false,
			pending: PendingChangeSet::new(),
			coalescer: RenderCoalescer::new(quiet_period),
			filter: RowFilter::default(),
		}
	}

	/// True once both the catalog and a snapshot have been loaded.
	pub fn is_ready(&self) -> bool {
		self.catalog.is_some() && self.snapshot_loaded
	}

	pub fn load_catalog(&mut self, catalog: RouterCatalog, now: Instant) {
		self.snapshot.relabel(&catalog);
		self.catalog = Some(catalog);
		self.schedule_repaint(now);
	}

	pub fn load_valid_sources(&mut self, valid: ValidSourceSet) {
		self.valid = valid;
	}

	/// Replaces the snapshot and reconciles the pending set against it.
	pub fn load_snapshot(&mut self, lines: Vec<RouterTableLine>, now: Instant) {
		self.snapshot.load(lines);
		if let Some(catalog) = &self.catalog {
			self.snapshot.relabel(catalog);
		}
		self.snapshot_loaded = true;
		self.pending.reconcile(&self.snapshot);
		self.schedule_repaint(now);
	}

	/// Applies one push update, reconciles, and restarts the repaint window.
	///
	/// Returns the number of pending edits the update retracted. On error
	/// nothing changed and no repaint was scheduled.
	pub fn on_push(&mut self, update: &CrosspointUpdate, now: Instant) -> Result<usize> {
		let catalog = self.catalog.as_ref().ok_or(EngineError::UnknownDestination(update.destination))?;
		let line = self.snapshot.apply_update(catalog, update)?;
		tracing::trace!(
			destination = %line.id,
			name = %line.name,
			level = %update.destination_level,
			source = %update.source,
			locked = update.locked,
			"applied push update"
		);
		let retracted = self.pending.reconcile(&self.snapshot);
		self.coalescer.request(now);
		Ok(retracted)
	}

	/// Records an operator edit as a pending change.
	///
	/// `text` must exactly match one of the column's valid labels. Returns the
	/// pending entry, or `None` when the edit already matches the snapshot
	/// and was retracted immediately.
	pub fn edit_cell(&mut self, destination: DestinationId, level: LevelId, text: &str, now: Instant) -> Result<Option<PendingChange>> {
		if self.snapshot.line(destination).is_none() {
			return Err(EngineError::UnknownDestination(destination));
		}
		let catalog = self.catalog.as_ref().ok_or(EngineError::UnknownDestination(destination))?;
		let value = Candidates::new(catalog, &self.valid).resolve(destination, level, text)?;
		let key = CrosspointKey::new(destination, level);
		if self.snapshot.crosspoint(key).is_none() {
			return Err(EngineError::UnknownLevel { destination, level });
		}

		self.pending.enqueue(PendingChange { key, value });
		self.pending.reconcile(&self.snapshot);
		self.schedule_repaint(now);
		Ok(self.pending.get(key).copied())
	}

	/// Withdraws the pending edit for `key`.
	pub fn withdraw(&mut self, key: CrosspointKey, now: Instant) -> Option<PendingChange> {
		let withdrawn = self.pending.withdraw(key)?;
		self.schedule_repaint(now);
		Some(withdrawn)
	}

	/// Reconciles after the operator's own commit round-trip completed.
	pub fn on_commit_acknowledged(&mut self, now: Instant) -> usize {
		let retracted = self.pending.reconcile(&self.snapshot);
		if retracted > 0 {
			self.schedule_repaint(now);
		}
		retracted
	}

	pub fn set_filter(&mut self, filter: RowFilter, now: Instant) {
		if self.filter != filter {
			self.filter = filter;
			self.schedule_repaint(now);
		}
	}

	/// Emits the projected matrix if the coalescing window has elapsed.
	pub fn poll_repaint(&mut self, now: Instant) -> Option<DisplayMatrix> {
		self.coalescer.poll(now).then(|| self.project())
	}

	pub fn repaint_deadline(&self) -> Option<Instant> {
		self.coalescer.deadline()
	}

	/// Current matrix: snapshot overlaid with pending edits and locks.
	pub fn project(&self) -> DisplayMatrix {
		let empty = RouterCatalog::default();
		let catalog = self.catalog.as_ref().unwrap_or(&empty);
		project(self.router, catalog, &self.snapshot, &self.pending, &self.filter)
	}

	/// Destinations of the currently displayed rows, in display order.
	pub fn visible_destinations(&self) -> Vec<DestinationId> {
		visible_destinations(&self.snapshot, &self.filter)
	}

	pub fn router(&self) -> RouterId {
		self.router
	}

	pub fn catalog(&self) -> Option<&RouterCatalog> {
		self.catalog.as_ref()
	}

	pub fn valid_sources(&self) -> &ValidSourceSet {
		&self.valid
	}

	pub fn snapshot(&self) -> &TableSnapshot {
		&self.snapshot
	}

	pub fn pending(&self) -> &PendingChangeSet {
		&self.pending
	}

	pub fn filter(&self) -> &RowFilter {
		&self.filter
	}

	fn schedule_repaint(&mut self, now: Instant) {
		if self.is_ready() {
			self.coalescer.request(now);
		}
	}
}
