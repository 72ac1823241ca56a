//! Resolution of operator input against a column's valid sources.

use bfc_model::{DestinationId, LevelId, RouterCatalog, SourceLevel, ValidSourceSet};

use crate::error::{EngineError, Result};

/// Candidate lookup for edits of one router.
#[derive(Debug, Clone, Copy)]
pub struct Candidates<'a> {
	catalog: &'a RouterCatalog,
	valid: &'a ValidSourceSet,
}

impl<'a> Candidates<'a> {
	pub fn new(catalog: &'a RouterCatalog, valid: &'a ValidSourceSet) -> Self {
		Self { catalog, valid }
	}

	/// Returns true when the cell accepts edits.
	pub fn is_editable(&self, destination: DestinationId, level: LevelId) -> bool {
		self.catalog.supports(destination, level)
	}

	/// Display strings offered for the column of `level`.
	pub fn options(&self, level: LevelId) -> &'a [String] {
		self.valid.column(level).map(|(_, labels)| labels).unwrap_or_default()
	}

	/// Resolves `text` to a source-level by exact label match within the column.
	pub fn resolve(&self, destination: DestinationId, level: LevelId, text: &str) -> Result<SourceLevel> {
		if self.catalog.destination(destination).is_none() {
			return Err(EngineError::UnknownDestination(destination));
		}
		if !self.is_editable(destination, level) {
			return Err(EngineError::ReadOnlyCell { destination, level });
		}
		let invalid = || EngineError::InvalidEditValue {
			level,
			value: text.to_string(),
		};
		let (sources, labels) = self.valid.column(level).ok_or_else(invalid)?;
		let index = labels.iter().position(|label| label == text).ok_or_else(invalid)?;
		sources.get(index).map(|candidate| candidate.value()).ok_or_else(invalid)
	}
}
