use serde::{Deserialize, Serialize};

use crate::ids::{DestinationId, LevelId, RouterId, SourceId, SourceLevel};

/// A signal plane on a router (video, audio channel, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
	pub id: LevelId,
	pub name: String,
}

/// A named input endpoint and the levels it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
	pub id: SourceId,
	pub name: String,
	#[serde(default)]
	pub levels: Vec<LevelId>,
}

/// A named output endpoint and the levels it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
	pub id: DestinationId,
	pub name: String,
	#[serde(default)]
	pub levels: Vec<LevelId>,
}

/// Router entry from the backend's router list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSummary {
	pub id: RouterId,
	pub display_name: String,
	pub short_name: String,
}

/// Levels, sources and destinations of one router.
///
/// Immutable for the lifetime of a router selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterCatalog {
	#[serde(default)]
	pub levels: Vec<Level>,
	#[serde(default)]
	pub sources: Vec<Source>,
	#[serde(default)]
	pub destinations: Vec<Destination>,
}

impl RouterCatalog {
	pub fn level(&self, id: LevelId) -> Option<&Level> {
		self.levels.iter().find(|level| level.id == id)
	}

	pub fn source(&self, id: SourceId) -> Option<&Source> {
		self.sources.iter().find(|source| source.id == id)
	}

	pub fn destination(&self, id: DestinationId) -> Option<&Destination> {
		self.destinations.iter().find(|destination| destination.id == id)
	}

	/// Returns true when `destination` lists `level` among its supported levels.
	pub fn supports(&self, destination: DestinationId, level: LevelId) -> bool {
		self.destination(destination).is_some_and(|d| d.levels.contains(&level))
	}

	/// Display label of a routed value: `"<source>.<level>"`.
	///
	/// Unknown sources yield an empty label; an unknown level leaves the
	/// source name alone.
	pub fn label(&self, value: SourceLevel) -> String {
		let Some(source) = self.source(value.source) else {
			return String::new();
		};
		match self.level(value.level) {
			Some(level) => format!("{}.{}", source.name, level.name),
			None => source.name.clone(),
		}
	}

	/// Column headers of the matrix: id, destination name, then one per level.
	pub fn headers(&self) -> Vec<String> {
		let mut headers = Vec::with_capacity(self.levels.len() + 2);
		headers.push("ID".to_string());
		headers.push("Destination".to_string());
		headers.extend(self.levels.iter().map(|level| level.name.clone()));
		headers
	}
}
