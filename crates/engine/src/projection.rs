//! Display projection: snapshot with pending and lock overlays.

use bfc_model::{CrosspointKey, DestinationId, LevelId, RouterCatalog, RouterId};

use crate::pending::PendingChangeSet;
use crate::snapshot::TableSnapshot;

/// Visual state of one matrix cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CellOverlay {
	#[default]
	Normal,
	/// An unconfirmed edit is pending for the cell.
	Queued,
	/// The crosspoint is locked.
	Locked,
	/// An edit is pending on a locked crosspoint.
	QueuedAndLocked,
}

impl CellOverlay {
	pub const fn from_flags(queued: bool, locked: bool) -> Self {
		match (queued, locked) {
			(false, false) => Self::Normal,
			(true, false) => Self::Queued,
			(false, true) => Self::Locked,
			(true, true) => Self::QueuedAndLocked,
		}
	}

	pub const fn is_queued(self) -> bool {
		matches!(self, Self::Queued | Self::QueuedAndLocked)
	}

	pub const fn is_locked(self) -> bool {
		matches!(self, Self::Locked | Self::QueuedAndLocked)
	}
}

/// One projected cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCell {
	/// Pending value's label when queued, otherwise the snapshot label.
	pub text: String,
	pub overlay: CellOverlay,
	/// False when the destination does not carry the column's level.
	pub editable: bool,
}

/// One projected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
	pub destination: DestinationId,
	pub name: String,
	pub cells: Vec<DisplayCell>,
}

/// Full matrix handed to the rendering collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayMatrix {
	pub router: RouterId,
	pub headers: Vec<String>,
	pub rows: Vec<DisplayRow>,
}

impl DisplayMatrix {
	pub fn row(&self, destination: DestinationId) -> Option<&DisplayRow> {
		self.rows.iter().find(|row| row.destination == destination)
	}

	pub fn cell(&self, key: CrosspointKey) -> Option<&DisplayCell> {
		let column = key.level.column()?;
		self.row(key.destination)?.cells.get(column)
	}

	/// Destination shown at each display row.
	pub fn destinations(&self) -> Vec<DestinationId> {
		self.rows.iter().map(|row| row.destination).collect()
	}
}

/// Case-sensitive substring filter on destination names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
	needle: String,
}

impl RowFilter {
	pub fn new(needle: impl Into<String>) -> Self {
		Self { needle: needle.into() }
	}

	pub fn matches(&self, name: &str) -> bool {
		self.needle.is_empty() || name.contains(&self.needle)
	}

	pub fn is_empty(&self) -> bool {
		self.needle.is_empty()
	}

	pub fn as_str(&self) -> &str {
		&self.needle
	}
}

/// Destinations of the rows that pass `filter`, in snapshot order.
pub fn visible_destinations(snapshot: &TableSnapshot, filter: &RowFilter) -> Vec<DestinationId> {
	snapshot.lines().iter().filter(|line| filter.matches(&line.name)).map(|line| line.id).collect()
}

/// Projects the snapshot, overlaid with pending edits and lock flags.
pub fn project(router: RouterId, catalog: &RouterCatalog, snapshot: &TableSnapshot, pending: &PendingChangeSet, filter: &RowFilter) -> DisplayMatrix {
	let rows = snapshot
		.lines()
		.iter()
		.filter(|line| filter.matches(&line.name))
		.map(|line| {
			let cells = line
				.crosspoints()
				.iter()
				.enumerate()
				.map(|(column, xpt)| {
					let level = LevelId::from_column(column);
					let queued = pending.get(CrosspointKey::new(line.id, level));
					let text = match queued {
						Some(change) => catalog.label(change.value),
						None => line.label(level).unwrap_or_default().to_string(),
					};
					DisplayCell {
						text,
						overlay: CellOverlay::from_flags(queued.is_some(), xpt.locked),
						editable: catalog.supports(line.id, level),
					}
				})
				.collect();
			DisplayRow {
				destination: line.id,
				name: line.name.clone(),
				cells,
			}
		})
		.collect();

	DisplayMatrix {
		router,
		headers: catalog.headers(),
		rows,
	}
}

#[cfg(test)]
mod tests {
	use bfc_model::{CrosspointUpdate, Destination, Level, RouterTableLine, Source, SourceId};
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::pending::PendingChange;

	fn catalog() -> RouterCatalog {
		RouterCatalog {
			levels: vec![
				Level {
					id: LevelId(1),
					name: "L1".into(),
				},
				Level {
					id: LevelId(2),
					name: "L2".into(),
				},
			],
			sources: vec![
				Source {
					id: SourceId(10),
					name: "SourceA".into(),
					levels: vec![LevelId(1)],
				},
				Source {
					id: SourceId(20),
					name: "SourceX".into(),
					levels: vec![LevelId(2)],
				},
			],
			destinations: vec![
				Destination {
					id: DestinationId(5),
					name: "MON5".into(),
					levels: vec![LevelId(1), LevelId(2)],
				},
				Destination {
					id: DestinationId(6),
					name: "REC6".into(),
					levels: vec![LevelId(1)],
				},
			],
		}
	}

	fn snapshot(catalog: &RouterCatalog) -> TableSnapshot {
		let locked = CrosspointUpdate {
			destination: DestinationId(6),
			destination_level: LevelId(1),
			source: SourceId(10),
			source_level: LevelId(1),
			locked: true,
		};
		let mut snapshot = TableSnapshot::new();
		snapshot.load(RouterTableLine::build(catalog, &[locked]));
		snapshot
	}

	#[test]
	fn overlay_flags_combine() {
		assert_eq!(CellOverlay::from_flags(true, true), CellOverlay::QueuedAndLocked);
		assert!(CellOverlay::QueuedAndLocked.is_queued());
		assert!(CellOverlay::Locked.is_locked());
		assert!(!CellOverlay::Queued.is_locked());
	}

	#[test]
	fn pending_edits_override_text_and_mark_queued() {
		let catalog = catalog();
		let snapshot = snapshot(&catalog);
		let mut pending = PendingChangeSet::new();
		pending.enqueue(PendingChange::new(DestinationId(5), LevelId(2), SourceId(20), LevelId(2)));
		pending.enqueue(PendingChange::new(DestinationId(6), LevelId(1), SourceId(20), LevelId(2)));

		let matrix = project(RouterId(1), &catalog, &snapshot, &pending, &RowFilter::default());

		assert_eq!(matrix.headers, vec!["ID", "Destination", "L1", "L2"]);
		let queued = matrix.cell(CrosspointKey::new(DestinationId(5), LevelId(2))).unwrap();
		assert_eq!(queued.text, "SourceX.L2");
		assert_eq!(queued.overlay, CellOverlay::Queued);

		let both = matrix.cell(CrosspointKey::new(DestinationId(6), LevelId(1))).unwrap();
		assert_eq!(both.overlay, CellOverlay::QueuedAndLocked);

		let plain = matrix.cell(CrosspointKey::new(DestinationId(5), LevelId(1))).unwrap();
		assert_eq!(plain.overlay, CellOverlay::Normal);
		assert_eq!(plain.text, "");
	}

	#[test]
	fn editability_follows_destination_levels() {
		let catalog = catalog();
		let snapshot = snapshot(&catalog);
		let matrix = project(RouterId(1), &catalog, &snapshot, &PendingChangeSet::new(), &RowFilter::default());

		let row = matrix.row(DestinationId(6)).unwrap();
		assert_eq!(row.cells.iter().map(|c| c.editable).collect::<Vec<_>>(), vec![true, false]);
		assert_eq!(row.cells[0].overlay, CellOverlay::Locked);
		assert_eq!(row.cells[0].text, "SourceA.L1");
	}

	#[test]
	fn filter_restricts_rows_by_name() {
		let catalog = catalog();
		let snapshot = snapshot(&catalog);
		let filter = RowFilter::new("REC");

		let matrix = project(RouterId(1), &catalog, &snapshot, &PendingChangeSet::new(), &filter);
		assert_eq!(matrix.destinations(), vec![DestinationId(6)]);
		assert_eq!(visible_destinations(&snapshot, &filter), vec![DestinationId(6)]);
		assert_eq!(visible_destinations(&snapshot, &RowFilter::default()).len(), 2);
	}
}
