use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bfc_model::{
	AlternateLevels, CommitRequest, CrosspointKey, CrosspointUpdate, LockToggleRequest, RouterCatalog, RouterId, RouterSummary, RouterTableLine,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{Transport, TransportError, UpdateStream};

/// Static description of one simulated router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDefinition {
	pub summary: RouterSummary,
	#[serde(default)]
	pub catalog: RouterCatalog,
	#[serde(default)]
	pub alternate_levels: Vec<AlternateLevels>,
	/// Initial routing.
	#[serde(default)]
	pub crosspoints: Vec<CrosspointUpdate>,
}

struct RouterState {
	definition: RouterDefinition,
	crosspoints: BTreeMap<CrosspointKey, CrosspointUpdate>,
	subscribers: Vec<mpsc::UnboundedSender<CrosspointUpdate>>,
}

impl RouterState {
	fn broadcast(&mut self, update: CrosspointUpdate) {
		self.subscribers.retain(|tx| tx.send(update).is_ok());
	}
}

#[derive(Default)]
struct Inner {
	routers: Vec<RouterId>,
	states: HashMap<RouterId, RouterState>,
	fail_commits: bool,
	fetch_delay: Duration,
}

impl Inner {
	fn state(&mut self, router: RouterId) -> Result<&mut RouterState, TransportError> {
		self.states.get_mut(&router).ok_or(TransportError::RouterNotFound(router))
	}
}

/// Loopback backend holding routers in memory.
///
/// Commits and lock toggles that succeed are echoed to every subscriber of
/// the router, exactly like a hardware tally would be. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryRouter {
	inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for MemoryRouter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.lock();
		f.debug_struct("MemoryRouter").field("routers", &inner.routers).finish_non_exhaustive()
	}
}

impl MemoryRouter {
	pub fn new(definitions: impl IntoIterator<Item = RouterDefinition>) -> Self {
		let mut inner = Inner::default();
		for definition in definitions {
			let id = definition.summary.id;
			let crosspoints = definition.crosspoints.iter().map(|update| (update.key(), *update)).collect();
			if inner.states.contains_key(&id) {
				tracing::warn!(router = %id, "duplicate router definition ignored");
				continue;
			}
			inner.routers.push(id);
			inner.states.insert(
				id,
				RouterState {
					definition,
					crosspoints,
					subscribers: Vec::new(),
				},
			);
		}
		Self {
			inner: Arc::new(Mutex::new(inner)),
		}
	}

	/// Makes every following commit fail with [`TransportError::Rejected`].
	pub fn set_fail_commits(&self, fail: bool) {
		self.inner.lock().fail_commits = fail;
	}

	/// Delays catalog and snapshot responses. The state is read when the
	/// request arrives, so a delayed snapshot can be older than pushes sent
	/// in the meantime.
	pub fn set_fetch_delay(&self, delay: Duration) {
		self.inner.lock().fetch_delay = delay;
	}

	/// Changes routing as if another operator or panel had done it.
	pub fn inject(&self, router: RouterId, update: CrosspointUpdate) -> Result<(), TransportError> {
		let mut inner = self.inner.lock();
		let state = inner.state(router)?;
		state.crosspoints.insert(update.key(), update);
		state.broadcast(update);
		Ok(())
	}

	/// Current routing of one crosspoint.
	pub fn crosspoint(&self, router: RouterId, key: CrosspointKey) -> Option<CrosspointUpdate> {
		let inner = self.inner.lock();
		inner.states.get(&router)?.crosspoints.get(&key).copied()
	}

	/// Ends every open subscription of `router`.
	pub fn close_subscriptions(&self, router: RouterId) {
		if let Some(state) = self.inner.lock().states.get_mut(&router) {
			state.subscribers.clear();
		}
	}

	/// Number of live subscriptions to `router`.
	pub fn subscriber_count(&self, router: RouterId) -> usize {
		let mut inner = self.inner.lock();
		let Some(state) = inner.states.get_mut(&router) else {
			return 0;
		};
		state.subscribers.retain(|tx| !tx.is_closed());
		state.subscribers.len()
	}

	async fn fetch_pause(&self) {
		let delay = self.inner.lock().fetch_delay;
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
	}
}

#[async_trait]
impl Transport for MemoryRouter {
	async fn fetch_routers(&self) -> Result<Vec<RouterSummary>, TransportError> {
		let inner = self.inner.lock();
		Ok(inner
			.routers
			.iter()
			.filter_map(|id| inner.states.get(id))
			.map(|state| state.definition.summary.clone())
			.collect())
	}

	async fn fetch_catalog(&self, router: RouterId) -> Result<RouterCatalog, TransportError> {
		let catalog = self.inner.lock().state(router)?.definition.catalog.clone();
		self.fetch_pause().await;
		Ok(catalog)
	}

	async fn fetch_snapshot(&self, router: RouterId) -> Result<Vec<RouterTableLine>, TransportError> {
		let lines = {
			let mut inner = self.inner.lock();
			let state = inner.state(router)?;
			let reports: Vec<CrosspointUpdate> = state.crosspoints.values().copied().collect();
			RouterTableLine::build(&state.definition.catalog, &reports)
		};
		self.fetch_pause().await;
		Ok(lines)
	}

	async fn fetch_valid_sources(&self, router: RouterId) -> Result<Vec<AlternateLevels>, TransportError> {
		let mut inner = self.inner.lock();
		Ok(inner.state(router)?.definition.alternate_levels.clone())
	}

	async fn subscribe_updates(&self, router: RouterId) -> Result<UpdateStream, TransportError> {
		let mut inner = self.inner.lock();
		let state = inner.state(router)?;
		let (tx, rx) = mpsc::unbounded_channel();
		state.subscribers.push(tx);
		Ok(rx)
	}

	async fn submit_commit(&self, request: CommitRequest) -> Result<(), TransportError> {
		let mut inner = self.inner.lock();
		if inner.fail_commits {
			return Err(TransportError::Rejected("commits disabled".into()));
		}
		let state = inner.state(request.router_id)?;
		let key = request.key();
		if !state.definition.catalog.supports(key.destination, key.level) {
			return Err(TransportError::Rejected(format!("no crosspoint {key}")));
		}
		if state.crosspoints.get(&key).is_some_and(|xpt| xpt.locked) {
			return Err(TransportError::Locked {
				destination: key.destination,
				level: key.level,
			});
		}

		let update = CrosspointUpdate {
			destination: key.destination,
			destination_level: key.level,
			source: request.source_id,
			source_level: request.source_level_id,
			locked: false,
		};
		state.crosspoints.insert(key, update);
		state.broadcast(update);
		Ok(())
	}

	async fn submit_lock_toggle(&self, request: LockToggleRequest) -> Result<(), TransportError> {
		let mut inner = self.inner.lock();
		let state = inner.state(request.router_id)?;
		let key = request.key();
		if !state.definition.catalog.supports(key.destination, key.level) {
			return Err(TransportError::Rejected(format!("no crosspoint {key}")));
		}

		let entry = state.crosspoints.entry(key).or_insert(CrosspointUpdate {
			destination: key.destination,
			destination_level: key.level,
			source: Default::default(),
			source_level: Default::default(),
			locked: false,
		});
		entry.locked = request.locked;
		let update = *entry;
		state.broadcast(update);
		Ok(())
	}
}
