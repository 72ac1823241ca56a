//! Table Snapshot Store: the authoritative routing matrix of one router.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use bfc_model::{Crosspoint, CrosspointKey, CrosspointUpdate, DestinationId, RouterCatalog, RouterTableLine};

use crate::error::{EngineError, Result};

/// Routing-matrix snapshot indexed by destination.
///
/// Row order is the fetch order and is preserved for display.
#[derive(Debug, Clone, Default)]
pub struct TableSnapshot {
	lines: Vec<RouterTableLine>,
	by_destination: HashMap<DestinationId, usize>,
}

impl TableSnapshot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the whole snapshot and its index.
	///
	/// A destination listed twice keeps its first line; later duplicates are
	/// dropped.
	pub fn load(&mut self, lines: Vec<RouterTableLine>) {
		let mut kept = Vec::with_capacity(lines.len());
		let mut by_destination = HashMap::with_capacity(lines.len());
		for line in lines {
			match by_destination.entry(line.id) {
				Entry::Vacant(slot) => {
					slot.insert(kept.len());
					kept.push(line);
				}
				Entry::Occupied(_) => {
					tracing::warn!(destination = %line.id, "duplicate destination in snapshot, keeping first");
				}
			}
		}
		*self = Self {
			lines: kept,
			by_destination,
		};
	}

	/// Applies one authoritative crosspoint fact in place.
	///
	/// Only the addressed column's label is recomputed. Returns the updated
	/// line.
	pub fn apply_update(&mut self, catalog: &RouterCatalog, update: &CrosspointUpdate) -> Result<&RouterTableLine> {
		let index = *self
			.by_destination
			.get(&update.destination)
			.ok_or(EngineError::UnknownDestination(update.destination))?;
		let line = &mut self.lines[index];
		if line.apply(catalog, update.destination_level, update.value(), update.locked).is_none() {
			return Err(EngineError::UnknownLevel {
				destination: update.destination,
				level: update.destination_level,
			});
		}
		Ok(&self.lines[index])
	}

	/// Recomputes every label, e.g. after the catalog arrived late.
	pub fn relabel(&mut self, catalog: &RouterCatalog) {
		for line in &mut self.lines {
			line.relabel(catalog);
		}
	}

	pub fn line(&self, destination: DestinationId) -> Option<&RouterTableLine> {
		self.by_destination.get(&destination).map(|&index| &self.lines[index])
	}

	pub fn crosspoint(&self, key: CrosspointKey) -> Option<&Crosspoint> {
		self.line(key.destination)?.crosspoint(key.level)
	}

	/// Lines in fetch order.
	pub fn lines(&self) -> &[RouterTableLine] {
		&self.lines
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}
}
