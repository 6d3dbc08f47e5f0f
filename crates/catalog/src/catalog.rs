// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::Arc;

use tessera_core::{SchemaVersion, TableId, def::TableDef, interface::ChangeLog};
use tracing::info;

use crate::{CacheLookup, InfoCache, InfoSchema, InfoSchemaBuilder, Result, load};

/// Versioned read access to schema metadata: the snapshot ring for the
/// hot path, the persisted change history for everything the ring has
/// evicted.
#[derive(Clone)]
pub struct Catalog {
	cache: Arc<InfoCache>,
	log: Arc<dyn ChangeLog>,
}

impl Catalog {
	pub fn new(cache_capacity: usize, log: Arc<dyn ChangeLog>) -> Self {
		Self {
			cache: Arc::new(InfoCache::new(cache_capacity)),
			log,
		}
	}

	pub fn latest(&self) -> Option<Arc<InfoSchema>> {
		self.cache.latest()
	}

	/// Like [`Self::latest`], with the empty version-zero snapshot for
	/// a catalog nothing has been published to yet.
	pub fn latest_or_empty(&self) -> Arc<InfoSchema> {
		self.cache
			.latest()
			.unwrap_or_else(|| Arc::new(InfoSchemaBuilder::empty().build(SchemaVersion::ZERO, 0)))
	}

	pub fn latest_version(&self) -> SchemaVersion {
		self.cache.latest_version()
	}

	/// Catch the cache up with the persisted history, publishing every
	/// missing version in order. Used by a fresh owner after failover
	/// and by followers applying announced versions.
	pub fn refresh(&self) -> Result<SchemaVersion> {
		let tail = self.log.latest_version()?;
		let mut current = self.cache.latest_version();
		if current >= tail {
			return Ok(current);
		}
		let entries = self.log.changes_up_to(tail)?;
		for entry in entries.into_iter() {
			if entry.version <= current {
				continue;
			}
			let mut builder = match self.cache.latest() {
				Some(snapshot) => InfoSchemaBuilder::from_snapshot(&snapshot),
				None => InfoSchemaBuilder::empty(),
			};
			builder.apply(&entry.change)?;
			let snapshot = builder.build(entry.version, entry.timestamp_ms);
			self.cache.publish(Arc::new(snapshot));
			current = entry.version;
		}
		Ok(current)
	}

	/// Snapshot at or before `version`; falls back to the out-of-core
	/// rebuild when the ring has evicted that far back.
	pub fn at_version(&self, version: SchemaVersion) -> Result<Arc<InfoSchema>> {
		match self.cache.get_at(version) {
			CacheLookup::Hit(snapshot) => Ok(snapshot),
			CacheLookup::Evicted | CacheLookup::Miss => {
				info!(version = version.0, "snapshot cache miss, replaying history");
				load::rebuild_at_version(self.log.as_ref(), version).map(Arc::new)
			}
		}
	}

	/// Snapshot at or before `timestamp_ms` (stale/flashback reads).
	pub fn at_timestamp(&self, timestamp_ms: u64) -> Result<Arc<InfoSchema>> {
		match self.cache.get_at_timestamp(timestamp_ms) {
			CacheLookup::Hit(snapshot) => Ok(snapshot),
			CacheLookup::Evicted | CacheLookup::Miss => {
				info!(timestamp_ms, "snapshot cache miss, replaying history");
				load::rebuild_at_timestamp(self.log.as_ref(), timestamp_ms)
					.map(Arc::new)
			}
		}
	}

	/// Atomically publish a freshly built snapshot as the new highest
	/// version. Single writer: only the owner/syncer calls this.
	pub fn publish(&self, snapshot: InfoSchema) -> bool {
		self.cache.publish(Arc::new(snapshot))
	}

	pub fn find_table(&self, schema_name: &str, table_name: &str) -> Option<TableDef> {
		self.cache.find_table(schema_name, table_name)
	}

	pub fn find_table_by_id(&self, id: TableId) -> Option<TableDef> {
		self.cache.find_table_by_id(id)
	}
}
