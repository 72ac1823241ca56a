use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub u32);

		impl $name {
			/// Returns the raw backend value.
			pub const fn get(self) -> u32 {
				self.0
			}
		}

		impl From<u32> for $name {
			fn from(value: u32) -> Self {
				Self(value)
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				self.0.fmt(f)
			}
		}
	};
}

numeric_id!(
	/// Router identifier assigned by the backend configuration.
	RouterId
);
numeric_id!(
	/// Signal level identifier. Levels are numbered from 1.
	LevelId
);
numeric_id!(
	/// Source endpoint identifier.
	SourceId
);
numeric_id!(
	/// Destination endpoint identifier.
	DestinationId
);

impl LevelId {
	/// Zero-based column of this level within a table line.
	///
	/// Level 0 has no column.
	pub const fn column(self) -> Option<usize> {
		match self.0 {
			0 => None,
			n => Some(n as usize - 1),
		}
	}

	/// Level occupying the given zero-based column.
	pub const fn from_column(column: usize) -> Self {
		Self(column as u32 + 1)
	}
}

impl DestinationId {
	/// Sentinel for a display row with no destination mapped.
	pub const NONE: Self = Self(0);

	/// Returns true for the [`Self::NONE`] sentinel.
	pub const fn is_none(self) -> bool {
		self.0 == 0
	}
}

/// One destination-level cell: the key of a crosspoint and of a pending edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrosspointKey {
	pub destination: DestinationId,
	pub level: LevelId,
}

impl CrosspointKey {
	pub const fn new(destination: DestinationId, level: LevelId) -> Self {
		Self { destination, level }
	}
}

impl std::fmt::Display for CrosspointKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.destination, self.level)
	}
}

/// A source on one of its levels; the value a crosspoint routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLevel {
	pub source: SourceId,
	pub level: LevelId,
}

impl SourceLevel {
	pub const fn new(source: SourceId, level: LevelId) -> Self {
		Self { source, level }
	}
}
