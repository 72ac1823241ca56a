use serde::{Deserialize, Serialize};

use crate::catalog::RouterCatalog;
use crate::ids::{DestinationId, LevelId, SourceId, SourceLevel};
use crate::wire::CrosspointUpdate;

/// Current routing of one destination-level, as held in a table line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crosspoint {
	pub destination_level_id: LevelId,
	pub source_id: SourceId,
	pub source_level_id: LevelId,
	#[serde(default)]
	pub locked: bool,
}

impl Crosspoint {
	pub fn value(&self) -> SourceLevel {
		SourceLevel::new(self.source_id, self.source_level_id)
	}
}

/// One matrix row: a destination and its crosspoint per level.
///
/// `crosspoints` is indexed by `destination_level_id - 1`. The label column
/// is a display cache derived from the crosspoints and the catalog; it only
/// changes through [`Self::apply`] and [`Self::relabel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterTableLine {
	pub id: DestinationId,
	pub name: String,
	crosspoints: Vec<Crosspoint>,
	#[serde(default)]
	crosspoints_as_string: Vec<String>,
}

impl RouterTableLine {
	/// Creates a line with empty labels; call [`Self::relabel`] to fill them.
	pub fn new(id: DestinationId, name: impl Into<String>, crosspoints: Vec<Crosspoint>) -> Self {
		let labels = vec![String::new(); crosspoints.len()];
		Self {
			id,
			name: name.into(),
			crosspoints,
			crosspoints_as_string: labels,
		}
	}

	/// Assembles table lines from flat crosspoint reports.
	///
	/// Produces one line per catalog destination in catalog order, one column
	/// per catalog level. Reports for unknown destinations or out-of-range
	/// levels are skipped.
	pub fn build(catalog: &RouterCatalog, reports: &[CrosspointUpdate]) -> Vec<Self> {
		let columns = catalog.levels.len();
		let mut lines: Vec<Self> = catalog
			.destinations
			.iter()
			.map(|destination| {
				let crosspoints = (0..columns)
					.map(|column| Crosspoint {
						destination_level_id: LevelId::from_column(column),
						..Crosspoint::default()
					})
					.collect();
				Self::new(destination.id, destination.name.clone(), crosspoints)
			})
			.collect();

		for report in reports {
			let Some(line) = lines.iter_mut().find(|line| line.id == report.destination) else {
				continue;
			};
			let _ = line.apply(catalog, report.destination_level, report.value(), report.locked);
		}
		for line in &mut lines {
			line.relabel(catalog);
		}
		lines
	}

	pub fn crosspoints(&self) -> &[Crosspoint] {
		&self.crosspoints
	}

	pub fn labels(&self) -> &[String] {
		&self.crosspoints_as_string
	}

	pub fn crosspoint(&self, level: LevelId) -> Option<&Crosspoint> {
		level.column().and_then(|column| self.crosspoints.get(column))
	}

	pub fn label(&self, level: LevelId) -> Option<&str> {
		level.column().and_then(|column| self.crosspoints_as_string.get(column)).map(String::as_str)
	}

	/// Overwrites the crosspoint at `level` in place and relabels that column only.
	///
	/// Returns `None` when the line has no column for `level`.
	pub fn apply(&mut self, catalog: &RouterCatalog, level: LevelId, value: SourceLevel, locked: bool) -> Option<&Crosspoint> {
		let column = level.column()?;
		let crosspoint = self.crosspoints.get_mut(column)?;
		crosspoint.destination_level_id = level;
		crosspoint.source_id = value.source;
		crosspoint.source_level_id = value.level;
		crosspoint.locked = locked;

		if self.crosspoints_as_string.len() < self.crosspoints.len() {
			self.crosspoints_as_string.resize(self.crosspoints.len(), String::new());
		}
		self.crosspoints_as_string[column] = catalog.label(value);
		self.crosspoints.get(column)
	}

	/// Recomputes every label from the catalog.
	pub fn relabel(&mut self, catalog: &RouterCatalog) {
		self.crosspoints_as_string = self.crosspoints.iter().map(|xpt| catalog.label(xpt.value())).collect();
	}
}
