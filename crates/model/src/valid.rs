use serde::{Deserialize, Serialize};

use crate::catalog::RouterCatalog;
use crate::ids::{LevelId, SourceId, SourceLevel};

/// One legal choice for a destination-level column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidSource {
	pub source_id: SourceId,
	pub source_level_id: LevelId,
}

impl ValidSource {
	pub fn value(&self) -> SourceLevel {
		SourceLevel::new(self.source_id, self.source_level_id)
	}
}

/// Extra source levels offered in a column besides the column's own level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateLevels {
	pub level: LevelId,
	#[serde(default)]
	pub alternates: Vec<LevelId>,
}

/// Per-column candidate sources and their display labels.
///
/// Both vectors are indexed by column (`level - 1`); within a column the
/// label at index `i` names the candidate at index `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidSourceSet {
	#[serde(default)]
	pub sources: Vec<Vec<ValidSource>>,
	#[serde(default)]
	pub sources_as_string: Vec<Vec<String>>,
}

impl ValidSourceSet {
	/// Derives the candidate lists from the catalogs.
	///
	/// Every source contributes one candidate per supported level to that
	/// level's column, in catalog order. Each column then appends the native
	/// candidates of its alternate levels.
	pub fn compute(catalog: &RouterCatalog, alternates: &[AlternateLevels]) -> Self {
		let columns = catalog.levels.len();
		let mut native_sources = vec![Vec::new(); columns];
		let mut native_labels = vec![Vec::new(); columns];

		for source in &catalog.sources {
			for &level in &source.levels {
				let Some(column) = level.column().filter(|&c| c < columns) else {
					continue;
				};
				let candidate = ValidSource {
					source_id: source.id,
					source_level_id: level,
				};
				native_labels[column].push(catalog.label(candidate.value()));
				native_sources[column].push(candidate);
			}
		}

		let mut set = Self {
			sources: native_sources.clone(),
			sources_as_string: native_labels.clone(),
		};
		for entry in alternates {
			let Some(column) = entry.level.column().filter(|&c| c < columns) else {
				continue;
			};
			for alternate in &entry.alternates {
				let Some(alt_column) = alternate.column().filter(|&c| c < columns && c != column) else {
					continue;
				};
				set.sources[column].extend_from_slice(&native_sources[alt_column]);
				set.sources_as_string[column].extend_from_slice(&native_labels[alt_column]);
			}
		}
		set
	}

	/// Candidates and labels for the column of `level`.
	pub fn column(&self, level: LevelId) -> Option<(&[ValidSource], &[String])> {
		let column = level.column()?;
		let sources = self.sources.get(column)?;
		let labels = self.sources_as_string.get(column)?;
		Some((sources.as_slice(), labels.as_slice()))
	}
}
