//! View driver: the single task that owns a view's reconciliation state.
//!
//! # Purpose
//!
//! - Owns the active router selection: its [`Reconciler`], push
//!   subscription, commit submitter and [`SelectionToken`].
//! - Serializes every input (operator commands, push updates, fetch and
//!   submit completions, the repaint deadline) through one `select!` loop, so
//!   each reaction step runs to completion before the next input is seen.
//! - Hands projected matrices and notices to a [`DisplaySink`].
//!
//! # Mental model
//!
//! Fetches and submissions run as spawned tasks under a child of the
//! selection token and report back on channels, tagged with the selection
//! generation. Switching routers cancels the old token and bumps the
//! generation; anything still arriving for the old generation is discarded
//! at the time it is applied.
//!
//! # Key types
//!
//! | Type | Role |
//! |---|---|
//! | [`ViewHandle`] | Operator-facing command API, cheap to call from any task |
//! | [`DisplaySink`] | Rendering collaborator receiving matrices and notices |
//! | [`ViewEvent`] | Channel form of the sink callbacks |
//! | [`Notice`] | Non-fatal problems worth showing to the operator |
//!
//! # Lifecycle
//!
//! - [`open_view`] spawns the driver and requests the router list; the first
//!   router is selected unless the operator already picked one.
//! - Selecting a router subscribes to its push stream first, then fetches
//!   the snapshot, so no update between the two is lost. Updates that arrive
//!   before the snapshot and catalog are loaded are buffered and replayed.
//! - When the push stream ends the driver waits `resubscribe_delay`,
//!   subscribes again and refetches the snapshot. Updates on the new stream
//!   are buffered until that snapshot lands. Pending edits survive.
//! - [`ViewHandle::close`] or dropping every handle tears the view down:
//!   the selection token is cancelled and the push stream released.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use bfc_model::{
	AlternateLevels, CrosspointKey, CrosspointUpdate, DestinationId, LevelId, RouterCatalog, RouterId, RouterSummary, RouterTableLine, ValidSourceSet,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pending::PendingChange;
use crate::projection::{DisplayMatrix, RowFilter};
use crate::reconciler::Reconciler;
use crate::selection::{SelectionClock, SelectionToken};
use crate::submit::{CellSelection, CommitSubmitter, SubmitOutcome, SubmitReport};
use crate::transport::{Transport, TransportError, UpdateStream};

/// Non-fatal condition reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
	/// A commit was not accepted; the pending edit stays visible for retry.
	CommitFailed { key: CrosspointKey, error: TransportError },
	/// A lock toggle was not accepted.
	LockToggleFailed { key: CrosspointKey, error: TransportError },
	/// A fetch or subscription request failed. `router` is `None` for the
	/// router list.
	FetchFailed { router: Option<RouterId>, error: TransportError },
	/// The push stream ended; a resubscribe is scheduled.
	SubscriptionClosed { router: RouterId },
}

impl std::fmt::Display for Notice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::CommitFailed { key, error } => write!(f, "take {key} failed: {error}"),
			Self::LockToggleFailed { key, error } => write!(f, "lock {key} failed: {error}"),
			Self::FetchFailed { router: Some(router), error } => write!(f, "router {router}: fetch failed: {error}"),
			Self::FetchFailed { router: None, error } => write!(f, "router list fetch failed: {error}"),
			Self::SubscriptionClosed { router } => write!(f, "router {router}: update stream closed, reconnecting"),
		}
	}
}

/// Rendering collaborator of a view.
pub trait DisplaySink: Send + 'static {
	/// Called at most once per coalescing window with the projected matrix.
	fn on_display_update(&mut self, matrix: &DisplayMatrix);

	fn on_notice(&mut self, notice: Notice) {
		tracing::info!(%notice, "view notice");
	}

	fn on_routers(&mut self, _routers: &[RouterSummary]) {}
}

/// Sink callbacks as channel messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
	Display(DisplayMatrix),
	Notice(Notice),
	Routers(Vec<RouterSummary>),
}

impl DisplaySink for mpsc::UnboundedSender<ViewEvent> {
	fn on_display_update(&mut self, matrix: &DisplayMatrix) {
		let _ = self.send(ViewEvent::Display(matrix.clone()));
	}

	fn on_notice(&mut self, notice: Notice) {
		let _ = self.send(ViewEvent::Notice(notice));
	}

	fn on_routers(&mut self, routers: &[RouterSummary]) {
		let _ = self.send(ViewEvent::Routers(routers.to_vec()));
	}
}

enum ViewCommand {
	SelectRouter(RouterId),
	Edit {
		destination: DestinationId,
		level: LevelId,
		text: String,
		reply: oneshot::Sender<Result<Option<PendingChange>>>,
	},
	Withdraw(CrosspointKey),
	Take(oneshot::Sender<usize>),
	ToggleLock(CellSelection, oneshot::Sender<usize>),
	SetFilter(String),
	Pending(oneshot::Sender<Vec<PendingChange>>),
	Close,
}

/// Operator-facing handle of a running view.
///
/// Dropping the handle closes the view.
#[derive(Debug)]
pub struct ViewHandle {
	commands: mpsc::UnboundedSender<ViewCommand>,
	task: JoinHandle<()>,
}

impl ViewHandle {
	/// Switches the view to `router`, discarding the previous selection.
	pub fn select_router(&self, router: RouterId) -> Result<()> {
		self.send(ViewCommand::SelectRouter(router))
	}

	/// Queues an edit of one cell.
	///
	/// Resolves to the pending entry, or `None` when the cell already routes
	/// the requested value.
	pub async fn edit(&self, destination: DestinationId, level: LevelId, text: impl Into<String>) -> Result<Option<PendingChange>> {
		let (reply, rx) = oneshot::channel();
		self.send(ViewCommand::Edit {
			destination,
			level,
			text: text.into(),
			reply,
		})?;
		rx.await.map_err(|_| EngineError::ViewClosed)?
	}

	/// Drops the pending edit for `key` without committing it.
	pub fn withdraw(&self, key: CrosspointKey) -> Result<()> {
		self.send(ViewCommand::Withdraw(key))
	}

	/// Submits every pending edit. Resolves to the number of requests issued.
	pub async fn take(&self) -> Result<usize> {
		let (reply, rx) = oneshot::channel();
		self.send(ViewCommand::Take(reply))?;
		rx.await.map_err(|_| EngineError::ViewClosed)
	}

	/// Flips the lock state of every addressable cell in `selection`.
	pub async fn toggle_lock_range(&self, selection: CellSelection) -> Result<usize> {
		let (reply, rx) = oneshot::channel();
		self.send(ViewCommand::ToggleLock(selection, reply))?;
		rx.await.map_err(|_| EngineError::ViewClosed)
	}

	/// Shows only destinations whose name contains `needle`.
	pub fn set_filter(&self, needle: impl Into<String>) -> Result<()> {
		self.send(ViewCommand::SetFilter(needle.into()))
	}

	/// Current pending edits of the active selection.
	pub async fn pending(&self) -> Result<Vec<PendingChange>> {
		let (reply, rx) = oneshot::channel();
		self.send(ViewCommand::Pending(reply))?;
		rx.await.map_err(|_| EngineError::ViewClosed)
	}

	/// Tears the view down and waits for the driver to exit.
	pub async fn close(self) {
		let _ = self.commands.send(ViewCommand::Close);
		if let Err(err) = self.task.await {
			tracing::warn!(error = %err, "view driver did not shut down cleanly");
		}
	}

	fn send(&self, command: ViewCommand) -> Result<()> {
		self.commands.send(command).map_err(|_| EngineError::ViewClosed)
	}
}

/// Starts a view over `transport`. Must be called inside a tokio runtime.
pub fn open_view<S: DisplaySink>(transport: Arc<dyn Transport>, sink: S, config: EngineConfig) -> ViewHandle {
	let (commands, commands_rx) = mpsc::unbounded_channel();
	let (driver, fetched_rx, reports_rx) = ViewDriver::new(transport, sink, config);
	let task = tokio::spawn(driver.run(commands_rx, fetched_rx, reports_rx));
	ViewHandle { commands, task }
}

enum Fetched {
	Routers(std::result::Result<Vec<RouterSummary>, TransportError>),
	Catalog(std::result::Result<RouterCatalog, TransportError>),
	ValidSources(std::result::Result<Vec<AlternateLevels>, TransportError>),
	Subscribed(std::result::Result<UpdateStream, TransportError>),
	Snapshot(std::result::Result<Vec<RouterTableLine>, TransportError>),
	ResubscribeDue,
}

struct Tagged {
	router: RouterId,
	generation: u64,
	fetched: Fetched,
}

/// Generation used for requests not tied to a selection.
const UNSCOPED: u64 = 0;

struct Session {
	token: SelectionToken,
	reconciler: Reconciler,
	submitter: CommitSubmitter,
	updates: Option<UpdateStream>,
	alternates: Option<Vec<AlternateLevels>>,
	/// Updates received before the view was ready, replayed in order.
	early: Vec<CrosspointUpdate>,
	/// Set from stream loss until the refetched snapshot lands. Updates
	/// are buffered meanwhile so the older snapshot cannot overwrite them.
	resyncing: bool,
}

struct ViewDriver<S> {
	transport: Arc<dyn Transport>,
	sink: S,
	config: EngineConfig,
	clock: SelectionClock,
	session: Option<Session>,
	filter: RowFilter,
	fetched_tx: mpsc::UnboundedSender<Tagged>,
	reports_tx: mpsc::UnboundedSender<SubmitReport>,
}

fn now() -> Instant {
	tokio::time::Instant::now().into_std()
}

async fn repaint_due(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
		None => std::future::pending().await,
	}
}

async fn next_update(session: Option<&mut Session>) -> Option<CrosspointUpdate> {
	match session.and_then(|session| session.updates.as_mut()) {
		Some(stream) => stream.recv().await,
		None => std::future::pending().await,
	}
}

impl<S: DisplaySink> ViewDriver<S> {
	fn new(
		transport: Arc<dyn Transport>,
		sink: S,
		config: EngineConfig,
	) -> (Self, mpsc::UnboundedReceiver<Tagged>, mpsc::UnboundedReceiver<SubmitReport>) {
		let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
		let (reports_tx, reports_rx) = mpsc::unbounded_channel();
		let driver = Self {
			transport,
			sink,
			config,
			clock: SelectionClock::new(),
			session: None,
			filter: RowFilter::default(),
			fetched_tx,
			reports_tx,
		};
		(driver, fetched_rx, reports_rx)
	}

	async fn run(
		mut self,
		mut commands: mpsc::UnboundedReceiver<ViewCommand>,
		mut fetched: mpsc::UnboundedReceiver<Tagged>,
		mut reports: mpsc::UnboundedReceiver<SubmitReport>,
	) {
		self.spawn_router_list();
		loop {
			let deadline = self.session.as_ref().and_then(|session| session.reconciler.repaint_deadline());
			tokio::select! {
				command = commands.recv() => match command {
					Some(command) => {
						if self.on_command(command).is_break() {
							break;
						}
					}
					None => break,
				},
				Some(tagged) = fetched.recv() => self.on_fetched(tagged),
				Some(report) = reports.recv() => self.on_report(report),
				update = next_update(self.session.as_mut()) => self.on_update(update),
				() = repaint_due(deadline) => self.on_repaint_due(),
			}
		}
		self.end_session();
		tracing::debug!("view closed");
	}

	fn on_command(&mut self, command: ViewCommand) -> ControlFlow<()> {
		match command {
			ViewCommand::SelectRouter(router) => self.select(router),
			ViewCommand::Edit {
				destination,
				level,
				text,
				reply,
			} => {
				let result = match self.session.as_mut() {
					Some(session) => session.reconciler.edit_cell(destination, level, &text, now()),
					None => Err(EngineError::UnknownDestination(destination)),
				};
				if let Err(err) = &result {
					tracing::debug!(error = %err, "edit rejected");
				}
				let _ = reply.send(result);
			}
			ViewCommand::Withdraw(key) => {
				if let Some(session) = self.session.as_mut() {
					session.reconciler.withdraw(key, now());
				}
			}
			ViewCommand::Take(reply) => {
				let issued = self
					.session
					.as_ref()
					.map_or(0, |session| session.submitter.take(session.reconciler.pending()));
				let _ = reply.send(issued);
			}
			ViewCommand::ToggleLock(selection, reply) => {
				let issued = self.session.as_ref().map_or(0, |session| {
					let reconciler = &session.reconciler;
					let Some(catalog) = reconciler.catalog() else {
						return 0;
					};
					let rows = reconciler.visible_destinations();
					session.submitter.toggle_lock_range(selection, &rows, catalog, reconciler.snapshot())
				});
				let _ = reply.send(issued);
			}
			ViewCommand::SetFilter(needle) => {
				self.filter = RowFilter::new(needle);
				if let Some(session) = self.session.as_mut() {
					session.reconciler.set_filter(self.filter.clone(), now());
				}
			}
			ViewCommand::Pending(reply) => {
				let pending = self.session.as_ref().map(|session| session.reconciler.pending().to_vec()).unwrap_or_default();
				let _ = reply.send(pending);
			}
			ViewCommand::Close => return ControlFlow::Break(()),
		}
		ControlFlow::Continue(())
	}

	fn select(&mut self, router: RouterId) {
		self.end_session();
		let token = self.clock.select(router);
		tracing::info!(%router, generation = token.generation(), "selecting router");

		let mut reconciler = Reconciler::new(router, self.config.quiet_period());
		reconciler.set_filter(self.filter.clone(), now());
		let submitter = CommitSubmitter::new(Arc::clone(&self.transport), token.clone(), self.reports_tx.clone());
		self.session = Some(Session {
			token: token.clone(),
			reconciler,
			submitter,
			updates: None,
			alternates: None,
			early: Vec::new(),
			resyncing: false,
		});

		self.spawn_fetch(&token, |transport, router| async move { Fetched::Catalog(transport.fetch_catalog(router).await) });
		self.spawn_fetch(&token, |transport, router| async move {
			Fetched::ValidSources(transport.fetch_valid_sources(router).await)
		});
		self.spawn_subscribe(&token);
	}

	fn end_session(&mut self) {
		if let Some(session) = self.session.take() {
			tracing::debug!(router = %session.token.router(), pending = session.reconciler.pending().len(), "ending router selection");
			session.token.cancel();
		}
	}

	fn on_fetched(&mut self, tagged: Tagged) {
		let Tagged { router, generation, fetched } = tagged;
		if let Fetched::Routers(result) = fetched {
			self.on_router_list(result);
			return;
		}
		let Some(session) = self.session.as_mut().filter(|session| session.token.matches(generation)) else {
			let stale = EngineError::StaleResponse { router, generation };
			tracing::debug!(error = %stale, "discarding response");
			return;
		};

		let at = now();
		match fetched {
			Fetched::Routers(_) => {}
			Fetched::Catalog(Ok(catalog)) => {
				tracing::debug!(%router, levels = catalog.levels.len(), destinations = catalog.destinations.len(), "catalog loaded");
				session.reconciler.load_catalog(catalog, at);
				session.refresh_valid_sources();
				session.replay_early(at);
			}
			Fetched::ValidSources(Ok(alternates)) => {
				session.alternates = Some(alternates);
				session.refresh_valid_sources();
			}
			Fetched::Subscribed(Ok(stream)) => {
				tracing::debug!(%router, "subscribed to updates");
				session.updates = Some(stream);
				let token = session.token.clone();
				self.spawn_fetch(&token, |transport, router| async move { Fetched::Snapshot(transport.fetch_snapshot(router).await) });
			}
			Fetched::Snapshot(Ok(lines)) => {
				tracing::debug!(%router, rows = lines.len(), "snapshot loaded");
				session.reconciler.load_snapshot(lines, at);
				session.resyncing = false;
				session.replay_early(at);
			}
			Fetched::ResubscribeDue => {
				let token = session.token.clone();
				self.spawn_subscribe(&token);
			}
			Fetched::Subscribed(Err(error)) => {
				tracing::warn!(%router, %error, "subscription failed");
				self.sink.on_notice(Notice::FetchFailed { router: Some(router), error });
				self.schedule_resubscribe();
			}
			Fetched::Snapshot(Err(error)) => {
				tracing::warn!(%router, %error, "snapshot fetch failed");
				self.sink.on_notice(Notice::FetchFailed { router: Some(router), error });
				session.updates = None;
				session.resyncing = true;
				self.schedule_resubscribe();
			}
			Fetched::Catalog(Err(error)) | Fetched::ValidSources(Err(error)) => {
				tracing::warn!(%router, %error, "fetch failed");
				self.sink.on_notice(Notice::FetchFailed { router: Some(router), error });
			}
		}
	}

	fn on_router_list(&mut self, result: std::result::Result<Vec<RouterSummary>, TransportError>) {
		match result {
			Ok(routers) => {
				self.sink.on_routers(&routers);
				if self.session.is_none() {
					if let Some(first) = routers.first() {
						self.select(first.id);
					}
				}
			}
			Err(error) => {
				tracing::warn!(%error, "router list fetch failed");
				self.sink.on_notice(Notice::FetchFailed { router: None, error });
			}
		}
	}

	fn on_report(&mut self, report: SubmitReport) {
		let Some(session) = self.session.as_mut().filter(|session| session.token.matches(report.generation)) else {
			tracing::debug!(generation = report.generation, key = %report.outcome.key(), "discarding stale submit result");
			return;
		};
		match report.outcome {
			SubmitOutcome::Commit { result: Ok(()), request } => {
				tracing::trace!(key = %request.key(), "commit accepted");
				session.reconciler.on_commit_acknowledged(now());
			}
			SubmitOutcome::LockToggle { result: Ok(()), .. } => {}
			SubmitOutcome::Commit { request, result: Err(error) } => {
				tracing::warn!(key = %request.key(), %error, "commit failed");
				self.sink.on_notice(Notice::CommitFailed { key: request.key(), error });
			}
			SubmitOutcome::LockToggle { request, result: Err(error) } => {
				tracing::warn!(key = %request.key(), %error, "lock toggle failed");
				self.sink.on_notice(Notice::LockToggleFailed { key: request.key(), error });
			}
		}
	}

	fn on_update(&mut self, update: Option<CrosspointUpdate>) {
		let Some(session) = self.session.as_mut() else {
			return;
		};
		let Some(update) = update else {
			let router = session.token.router();
			tracing::warn!(%router, "update stream closed");
			session.updates = None;
			session.resyncing = true;
			self.sink.on_notice(Notice::SubscriptionClosed { router });
			self.schedule_resubscribe();
			return;
		};
		if session.reconciler.is_ready() && !session.resyncing {
			session.apply(&update, now());
		} else {
			session.early.push(update);
		}
	}

	fn on_repaint_due(&mut self) {
		let Some(session) = self.session.as_mut() else {
			return;
		};
		if let Some(matrix) = session.reconciler.poll_repaint(now()) {
			self.sink.on_display_update(&matrix);
		}
	}

	fn spawn_router_list(&self) {
		let transport = Arc::clone(&self.transport);
		let tx = self.fetched_tx.clone();
		tokio::spawn(async move {
			let fetched = Fetched::Routers(transport.fetch_routers().await);
			let _ = tx.send(Tagged {
				router: RouterId::default(),
				generation: UNSCOPED,
				fetched,
			});
		});
	}

	fn spawn_subscribe(&self, token: &SelectionToken) {
		self.spawn_fetch(token, |transport, router| async move {
			Fetched::Subscribed(transport.subscribe_updates(router).await)
		});
	}

	fn schedule_resubscribe(&self) {
		let Some(session) = self.session.as_ref() else {
			return;
		};
		let delay = self.config.resubscribe_delay();
		self.spawn_fetch(&session.token, move |_, _| async move {
			tokio::time::sleep(delay).await;
			Fetched::ResubscribeDue
		});
	}

	fn spawn_fetch<F, Fut>(&self, token: &SelectionToken, fetch: F)
	where
		F: FnOnce(Arc<dyn Transport>, RouterId) -> Fut,
		Fut: Future<Output = Fetched> + Send + 'static,
	{
		let token = token.child();
		let router = token.router();
		let request = fetch(Arc::clone(&self.transport), router);
		let tx = self.fetched_tx.clone();
		tokio::spawn(async move {
			let fetched = tokio::select! {
				biased;
				_ = token.cancelled() => return,
				fetched = request => fetched,
			};
			let _ = tx.send(Tagged {
				router,
				generation: token.generation(),
				fetched,
			});
		});
	}
}

impl Session {
	fn apply(&mut self, update: &CrosspointUpdate, at: Instant) {
		match self.reconciler.on_push(update, at) {
			Ok(retracted) if retracted > 0 => tracing::debug!(key = %update.key(), retracted, "push confirmed pending edits"),
			Ok(_) => {}
			Err(err) => tracing::warn!(error = %err, "dropping push update"),
		}
	}

	fn replay_early(&mut self, at: Instant) {
		if !self.reconciler.is_ready() || self.resyncing || self.early.is_empty() {
			return;
		}
		for update in std::mem::take(&mut self.early) {
			self.apply(&update, at);
		}
	}

	fn refresh_valid_sources(&mut self) {
		let (Some(catalog), Some(alternates)) = (self.reconciler.catalog(), self.alternates.as_deref()) else {
			return;
		};
		let valid = ValidSourceSet::compute(catalog, alternates);
		self.reconciler.load_valid_sources(valid);
	}
}
