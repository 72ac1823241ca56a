//! Pending Change Set: operator edits not yet confirmed by the backend.
//!
//! Entries are keyed by destination-level. Inserting an edit for a key that
//! already has one replaces it in place, keeping its position. The only
//! automatic removal path is [`PendingChangeSet::reconcile`]: an entry leaves
//! the set once the snapshot's crosspoint at its key routes exactly the
//! entry's source-level. There is no expiry; an unconfirmed edit survives
//! rejected commits, reconnects and snapshot reloads until it is satisfied or
//! withdrawn.

use bfc_model::{CrosspointKey, DestinationId, LevelId, SourceId, SourceLevel};

use crate::snapshot::TableSnapshot;

/// One unconfirmed crosspoint edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingChange {
	pub key: CrosspointKey,
	pub value: SourceLevel,
}

impl PendingChange {
	pub fn new(destination: DestinationId, destination_level: LevelId, source: SourceId, source_level: LevelId) -> Self {
		Self {
			key: CrosspointKey::new(destination, destination_level),
			value: SourceLevel::new(source, source_level),
		}
	}

	/// Returns true when the snapshot already routes this edit's value.
	pub fn is_satisfied_by(&self, snapshot: &TableSnapshot) -> bool {
		snapshot.crosspoint(self.key).is_some_and(|xpt| xpt.value() == self.value)
	}
}

/// Outcome of [`PendingChangeSet::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
	/// A new key was added.
	Inserted,
	/// An existing entry for the key was replaced.
	Replaced,
}

/// Ordered set of pending edits, at most one per key.
#[derive(Debug, Clone, Default)]
pub struct PendingChangeSet {
	entries: Vec<PendingChange>,
}

impl PendingChangeSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Upserts an edit by key.
	pub fn enqueue(&mut self, change: PendingChange) -> EnqueueOutcome {
		if let Some(existing) = self.entries.iter_mut().find(|entry| entry.key == change.key) {
			*existing = change;
			return EnqueueOutcome::Replaced;
		}
		self.entries.push(change);
		EnqueueOutcome::Inserted
	}

	/// Removes the edit for `key`, if any.
	pub fn withdraw(&mut self, key: CrosspointKey) -> Option<PendingChange> {
		let index = self.entries.iter().position(|entry| entry.key == key)?;
		Some(self.entries.remove(index))
	}

	/// Drops every entry the snapshot already satisfies.
	///
	/// Returns the number of retracted entries. Running it twice in a row is
	/// a no-op the second time.
	pub fn reconcile(&mut self, snapshot: &TableSnapshot) -> usize {
		let before = self.entries.len();
		self.entries.retain(|entry| !entry.is_satisfied_by(snapshot));
		let retracted = before - self.entries.len();
		if retracted > 0 {
			tracing::trace!(retracted, remaining = self.entries.len(), "retracted confirmed pending edits");
		}
		retracted
	}

	pub fn get(&self, key: CrosspointKey) -> Option<&PendingChange> {
		self.entries.iter().find(|entry| entry.key == key)
	}

	pub fn contains(&self, key: CrosspointKey) -> bool {
		self.get(key).is_some()
	}

	/// Entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
		self.entries.iter()
	}

	/// Copy of all entries, for overlays and commit submission.
	pub fn to_vec(&self) -> Vec<PendingChange> {
		self.entries.clone()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}
}

#[cfg(test)]
mod tests {
	use bfc_model::{Crosspoint, RouterTableLine};

	use super::*;

	fn snapshot_with(destination: u32, crosspoints: &[(u32, u32)]) -> TableSnapshot {
		let crosspoints = crosspoints
			.iter()
			.enumerate()
			.map(|(column, &(source, source_level))| Crosspoint {
				destination_level_id: LevelId::from_column(column),
				source_id: SourceId(source),
				source_level_id: LevelId(source_level),
				locked: false,
			})
			.collect();
		let mut snapshot = TableSnapshot::new();
		snapshot.load(vec![RouterTableLine::new(DestinationId(destination), "DST", crosspoints)]);
		snapshot
	}

	fn change(destination: u32, level: u32, source: u32, source_level: u32) -> PendingChange {
		PendingChange::new(DestinationId(destination), LevelId(level), SourceId(source), LevelId(source_level))
	}

	#[test]
	fn enqueue_replaces_existing_key_in_place() {
		let mut pending = PendingChangeSet::new();
		assert_eq!(pending.enqueue(change(5, 2, 20, 2)), EnqueueOutcome::Inserted);
		assert_eq!(pending.enqueue(change(6, 1, 10, 1)), EnqueueOutcome::Inserted);
		assert_eq!(pending.enqueue(change(5, 2, 30, 1)), EnqueueOutcome::Replaced);

		assert_eq!(pending.to_vec(), vec![change(5, 2, 30, 1), change(6, 1, 10, 1)]);
	}

	#[test]
	fn reconcile_retracts_satisfied_entries_only() {
		let snapshot = snapshot_with(5, &[(10, 1), (20, 2)]);
		let mut pending = PendingChangeSet::new();
		pending.enqueue(change(5, 2, 20, 2));
		pending.enqueue(change(5, 1, 11, 1));

		assert_eq!(pending.reconcile(&snapshot), 1);
		assert_eq!(pending.to_vec(), vec![change(5, 1, 11, 1)]);
		assert_eq!(pending.reconcile(&snapshot), 0);
	}

	#[test]
	fn reconcile_compares_against_the_entry_key_column() {
		// Column 1 routes (20, 2); an edit for column 2 asking for (20, 2)
		// must not be retracted by column 1's value.
		let snapshot = snapshot_with(5, &[(20, 2), (10, 1)]);
		let mut pending = PendingChangeSet::new();
		pending.enqueue(change(5, 2, 20, 2));

		assert_eq!(pending.reconcile(&snapshot), 0);
		assert_eq!(pending.len(), 1);
	}

	#[test]
	fn same_source_on_another_level_is_not_a_match() {
		let snapshot = snapshot_with(5, &[(10, 1), (20, 1)]);
		let mut pending = PendingChangeSet::new();
		pending.enqueue(change(5, 2, 20, 2));

		assert_eq!(pending.reconcile(&snapshot), 0);
	}

	#[test]
	fn entries_for_unknown_destinations_survive() {
		let snapshot = snapshot_with(5, &[(10, 1)]);
		let mut pending = PendingChangeSet::new();
		pending.enqueue(change(9, 1, 10, 1));

		assert_eq!(pending.reconcile(&snapshot), 0);
		assert!(pending.contains(CrosspointKey::new(DestinationId(9), LevelId(1))));
	}

	#[test]
	fn withdraw_removes_by_key() {
		let mut pending = PendingChangeSet::new();
		pending.enqueue(change(5, 2, 20, 2));
		let key = CrosspointKey::new(DestinationId(5), LevelId(2));

		assert_eq!(pending.withdraw(key), Some(change(5, 2, 20, 2)));
		assert_eq!(pending.withdraw(key), None);
		assert!(pending.is_empty());
	}
}
