use serde::{Deserialize, Serialize};

use crate::ids::{CrosspointKey, DestinationId, LevelId, RouterId, SourceId, SourceLevel};

/// One authoritative crosspoint fact pushed by the backend.
///
/// Field names follow the backend's JSON encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosspointUpdate {
	pub destination: DestinationId,
	pub destination_level: LevelId,
	pub source: SourceId,
	pub source_level: LevelId,
	#[serde(default)]
	pub locked: bool,
}

impl CrosspointUpdate {
	pub fn key(&self) -> CrosspointKey {
		CrosspointKey::new(self.destination, self.destination_level)
	}

	pub fn value(&self) -> SourceLevel {
		SourceLevel::new(self.source, self.source_level)
	}
}

/// Request to route a source-level onto a destination-level.
///
/// Carries the full tuple so the backend can apply it idempotently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRequest {
	pub router_id: RouterId,
	pub destination_id: DestinationId,
	pub destination_level_id: LevelId,
	pub source_id: SourceId,
	pub source_level_id: LevelId,
}

impl CommitRequest {
	pub fn key(&self) -> CrosspointKey {
		CrosspointKey::new(self.destination_id, self.destination_level_id)
	}

	pub fn value(&self) -> SourceLevel {
		SourceLevel::new(self.source_id, self.source_level_id)
	}
}

/// Request to set the absolute lock state of one crosspoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockToggleRequest {
	pub router_id: RouterId,
	pub destination_id: DestinationId,
	pub destination_level_id: LevelId,
	pub locked: bool,
}

impl LockToggleRequest {
	pub fn key(&self) -> CrosspointKey {
		CrosspointKey::new(self.destination_id, self.destination_level_id)
	}
}
