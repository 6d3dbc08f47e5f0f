// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{collections::VecDeque, sync::Arc};

use parking_lot::RwLock;
use tessera_core::{SchemaVersion, TableId, def::TableDef};
use tracing::warn;

use crate::InfoSchema;

/// Result of a versioned cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
	Hit(Arc<InfoSchema>),
	/// The requested point is older than the oldest cached entry; the
	/// caller must rebuild from persisted history.
	Evicted,
	/// Nothing cached at or below the requested point.
	Miss,
}

impl CacheLookup {
	pub fn hit(self) -> Option<Arc<InfoSchema>> {
		match self {
			CacheLookup::Hit(snapshot) => Some(snapshot),
			_ => None,
		}
	}
}

/// Fixed-capacity, version-ordered ring of the most recent snapshots,
/// newest first.
///
/// Single writer (the owner/syncer), many readers. Readers always
/// observe fully constructed snapshots: `publish` swaps a completed
/// `Arc<InfoSchema>` in under the write lock, all-or-nothing.
pub struct InfoCache {
	capacity: usize,
	entries: RwLock<VecDeque<Arc<InfoSchema>>>,
}

impl InfoCache {
	pub fn new(capacity: usize) -> Self {
		assert!(capacity > 0, "cache capacity must be non-zero");
		Self {
			capacity,
			entries: RwLock::new(VecDeque::with_capacity(capacity)),
		}
	}

	/// Highest-version snapshot, O(1).
	pub fn latest(&self) -> Option<Arc<InfoSchema>> {
		self.entries.read().front().cloned()
	}

	pub fn latest_version(&self) -> SchemaVersion {
		self.latest().map(|s| s.version()).unwrap_or(SchemaVersion::ZERO)
	}

	/// Exact-version lookup.
	pub fn get(&self, version: SchemaVersion) -> Option<Arc<InfoSchema>> {
		self.entries.read().iter().find(|s| s.version() == version).cloned()
	}

	/// Most recent snapshot at or before `version`.
	pub fn get_at(&self, version: SchemaVersion) -> CacheLookup {
		let entries = self.entries.read();
		let Some(oldest) = entries.back() else {
			return CacheLookup::Miss;
		};
		if version < oldest.version() {
			return CacheLookup::Evicted;
		}
		match entries.iter().find(|s| s.version() <= version) {
			Some(snapshot) => CacheLookup::Hit(snapshot.clone()),
			None => CacheLookup::Miss,
		}
	}

	/// Most recent snapshot committed at or before `timestamp_ms`.
	pub fn get_at_timestamp(&self, timestamp_ms: u64) -> CacheLookup {
		let entries = self.entries.read();
		let Some(oldest) = entries.back() else {
			return CacheLookup::Miss;
		};
		if timestamp_ms < oldest.timestamp_ms() {
			return CacheLookup::Evicted;
		}
		match entries.iter().find(|s| s.timestamp_ms() <= timestamp_ms) {
			Some(snapshot) => CacheLookup::Hit(snapshot.clone()),
			None => CacheLookup::Miss,
		}
	}

	/// Append a new highest-version snapshot, evicting the oldest entry
	/// at capacity. Rejects non-monotonic versions.
	pub fn publish(&self, snapshot: Arc<InfoSchema>) -> bool {
		let mut entries = self.entries.write();
		if let Some(newest) = entries.front() {
			if snapshot.version() <= newest.version() {
				warn!(
					version = snapshot.version().0,
					newest = newest.version().0,
					"rejecting non-monotonic snapshot publish"
				);
				return false;
			}
		}
		entries.push_front(snapshot);
		while entries.len() > self.capacity {
			entries.pop_back();
		}
		true
	}

	/// Search all cached generations, newest first, for a table by name.
	/// Serves lookups for tables that were dropped or renamed in the
	/// newest version but are still referenced by stale readers.
	pub fn find_table(&self, schema_name: &str, table_name: &str) -> Option<TableDef> {
		let entries = self.entries.read();
		for snapshot in entries.iter() {
			if let Some(schema) = snapshot.schema_by_name(schema_name) {
				if let Some(table) = snapshot.table_by_name(schema.id, table_name) {
					return Some(table.clone());
				}
			}
		}
		None
	}

	/// Search all cached generations, newest first, for a table by id.
	pub fn find_table_by_id(&self, id: TableId) -> Option<TableDef> {
		let entries = self.entries.read();
		for snapshot in entries.iter() {
			if let Some(table) = snapshot.table(id) {
				return Some(table.clone());
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use tessera_core::SchemaId;
	use crate::test_support::snapshot_with_table;

	use super::*;

	#[test]
	fn test_publish_and_latest() {
		let cache = InfoCache::new(4);
		assert!(cache.latest().is_none());

		assert!(cache.publish(Arc::new(snapshot_with_table(1, "t1", 10))));
		assert!(cache.publish(Arc::new(snapshot_with_table(1, "t1", 11))));
		assert_eq!(cache.latest().unwrap().version(), SchemaVersion(11));
	}

	#[test]
	fn test_publish_rejects_non_monotonic() {
		let cache = InfoCache::new(4);
		assert!(cache.publish(Arc::new(snapshot_with_table(1, "t1", 10))));
		assert!(!cache.publish(Arc::new(snapshot_with_table(1, "t1", 10))));
		assert!(!cache.publish(Arc::new(snapshot_with_table(1, "t1", 9))));
		assert_eq!(cache.latest().unwrap().version(), SchemaVersion(10));
	}

	#[test]
	fn test_eviction_at_capacity() {
		let cache = InfoCache::new(2);
		cache.publish(Arc::new(snapshot_with_table(1, "t1", 1)));
		cache.publish(Arc::new(snapshot_with_table(1, "t1", 2)));
		cache.publish(Arc::new(snapshot_with_table(1, "t1", 3)));

		assert_eq!(cache.latest().unwrap().version(), SchemaVersion(3));
		assert!(cache.get(SchemaVersion(2)).is_some());
		// Version 1 was evicted; a point read below the tail reports it
		assert_eq!(cache.get_at(SchemaVersion(1)), CacheLookup::Evicted);
	}

	#[test]
	fn test_get_at_or_before() {
		let cache = InfoCache::new(4);
		cache.publish(Arc::new(snapshot_with_table(1, "t1", 5)));
		cache.publish(Arc::new(snapshot_with_table(1, "t1", 8)));

		assert_eq!(cache.get_at(SchemaVersion(7)).hit().unwrap().version(), SchemaVersion(5));
		assert_eq!(cache.get_at(SchemaVersion(8)).hit().unwrap().version(), SchemaVersion(8));
		assert_eq!(cache.get_at(SchemaVersion(9)).hit().unwrap().version(), SchemaVersion(8));
		assert_eq!(cache.get_at(SchemaVersion(4)), CacheLookup::Evicted);
	}

	#[test]
	fn test_find_table_searches_older_generations() {
		let cache = InfoCache::new(4);
		cache.publish(Arc::new(snapshot_with_table(1, "orders", 5)));
		// Newest generation no longer carries the table under that name
		cache.publish(Arc::new(snapshot_with_table(2, "shipments", 6)));

		let table = cache.find_table("app", "orders").unwrap();
		assert_eq!(table.schema, SchemaId(1));
		assert!(cache.find_table("app", "nope").is_none());
	}
}
