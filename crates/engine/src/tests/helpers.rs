//! Fixtures and a sink harness for view tests.

use std::sync::Arc;
use std::time::Duration;

use bfc_model::{
	CrosspointKey, CrosspointUpdate, Destination, DestinationId, Level, LevelId, RouterCatalog, RouterId, RouterSummary, RouterTableLine, Source,
	SourceId, ValidSourceSet,
};
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::driver::{Notice, ViewEvent, ViewHandle, open_view};
use crate::projection::DisplayMatrix;
use crate::reconciler::Reconciler;
use crate::transport::{MemoryRouter, RouterDefinition};

pub const STUDIO: RouterId = RouterId(1);
pub const OUTSIDE: RouterId = RouterId(2);
pub const QUIET: Duration = Duration::from_millis(120);

pub fn key(destination: u32, level: u32) -> CrosspointKey {
	CrosspointKey::new(DestinationId(destination), LevelId(level))
}

pub fn update(destination: u32, level: u32, source: u32, source_level: u32, locked: bool) -> CrosspointUpdate {
	CrosspointUpdate {
		destination: DestinationId(destination),
		destination_level: LevelId(level),
		source: SourceId(source),
		source_level: LevelId(source_level),
		locked,
	}
}

fn level(id: u32, name: &str) -> Level {
	Level {
		id: LevelId(id),
		name: name.into(),
	}
}

fn source(id: u32, name: &str, levels: &[u32]) -> Source {
	Source {
		id: SourceId(id),
		name: name.into(),
		levels: levels.iter().copied().map(LevelId).collect(),
	}
}

fn destination(id: u32, name: &str, levels: &[u32]) -> Destination {
	Destination {
		id: DestinationId(id),
		name: name.into(),
		levels: levels.iter().copied().map(LevelId).collect(),
	}
}

/// Two-level studio router. Destination 5 level 2 is fed by 10/1 and
/// destination 6 level 1 is locked.
pub fn studio() -> RouterDefinition {
	RouterDefinition {
		summary: RouterSummary {
			id: STUDIO,
			display_name: "Studio".into(),
			short_name: "STU".into(),
		},
		catalog: RouterCatalog {
			levels: vec![level(1, "L1"), level(2, "L2")],
			sources: vec![source(10, "SourceA", &[1, 2]), source(20, "SourceX", &[1, 2])],
			destinations: vec![destination(5, "MON5", &[1, 2]), destination(6, "MON6", &[1, 2]), destination(7, "REC7", &[1])],
		},
		alternate_levels: Vec::new(),
		crosspoints: vec![update(5, 2, 10, 1, false), update(6, 1, 10, 1, true)],
	}
}

/// Single-level router with its own destinations.
pub fn outside() -> RouterDefinition {
	RouterDefinition {
		summary: RouterSummary {
			id: OUTSIDE,
			display_name: "Outside Broadcast".into(),
			short_name: "OB".into(),
		},
		catalog: RouterCatalog {
			levels: vec![level(1, "SDI")],
			sources: vec![source(30, "TRUCK", &[1])],
			destinations: vec![destination(100, "OB-OUT", &[1])],
		},
		alternate_levels: Vec::new(),
		crosspoints: vec![update(100, 1, 30, 1, false)],
	}
}

pub fn config() -> EngineConfig {
	EngineConfig {
		quiet_period_ms: QUIET.as_millis() as u64,
		resubscribe_delay_ms: 500,
	}
}

/// A view over a [`MemoryRouter`] with its sink events captured.
pub struct TestView {
	pub backend: MemoryRouter,
	pub view: ViewHandle,
	pub events: mpsc::UnboundedReceiver<ViewEvent>,
	pub notices: Vec<Notice>,
}

impl TestView {
	pub fn open(backend: MemoryRouter) -> Self {
		let (tx, events) = mpsc::unbounded_channel();
		let view = open_view(Arc::new(backend.clone()), tx, config());
		Self {
			backend,
			view,
			events,
			notices: Vec::new(),
		}
	}

	pub fn studio() -> Self {
		Self::open(MemoryRouter::new([studio(), outside()]))
	}

	/// Waits for the next repaint, recording notices on the way.
	pub async fn next_display(&mut self) -> DisplayMatrix {
		loop {
			match self.events.recv().await {
				Some(ViewEvent::Display(matrix)) => return matrix,
				Some(ViewEvent::Notice(notice)) => self.notices.push(notice),
				Some(ViewEvent::Routers(_)) => {}
				None => panic!("view closed while waiting for a repaint"),
			}
		}
	}

	/// Waits for the next notice, skipping repaints.
	pub async fn next_notice(&mut self) -> Notice {
		if !self.notices.is_empty() {
			return self.notices.remove(0);
		}
		loop {
			match self.events.recv().await {
				Some(ViewEvent::Notice(notice)) => return notice,
				Some(_) => {}
				None => panic!("view closed while waiting for a notice"),
			}
		}
	}

	/// Waits for the router list.
	pub async fn next_routers(&mut self) -> Vec<RouterSummary> {
		loop {
			match self.events.recv().await {
				Some(ViewEvent::Routers(routers)) => return routers,
				Some(ViewEvent::Notice(notice)) => self.notices.push(notice),
				Some(ViewEvent::Display(_)) => {}
				None => panic!("view closed while waiting for routers"),
			}
		}
	}

	/// Repaints already delivered, without waiting.
	pub fn drain_displays(&mut self) -> Vec<DisplayMatrix> {
		let mut displays = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			match event {
				ViewEvent::Display(matrix) => displays.push(matrix),
				ViewEvent::Notice(notice) => self.notices.push(notice),
				ViewEvent::Routers(_) => {}
			}
		}
		displays
	}
}

/// A ready reconciler over the studio router, as of `now`.
pub fn studio_reconciler(now: std::time::Instant) -> Reconciler {
	let definition = studio();
	let lines = RouterTableLine::build(&definition.catalog, &definition.crosspoints);
	let mut reconciler = Reconciler::new(STUDIO, QUIET);
	reconciler.load_valid_sources(ValidSourceSet::compute(&definition.catalog, &definition.alternate_levels));
	reconciler.load_catalog(definition.catalog, now);
	reconciler.load_snapshot(lines, now);
	reconciler
}

/// Lets spawned tasks and the driver run without moving the clock.
pub async fn settle() {
	for _ in 0..16 {
		tokio::task::yield_now().await;
	}
}
