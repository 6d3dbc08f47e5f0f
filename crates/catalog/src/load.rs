// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_core::{HistoryEntry, SchemaVersion, interface::ChangeLog};
use tracing::debug;

use crate::{InfoSchema, InfoSchemaBuilder, Result};

/// Rebuild the snapshot at `version` by replaying the persisted change
/// history from the beginning. Slow and exact; used when a stale or
/// flashback read asks for a version the cache has already evicted.
pub fn rebuild_at_version(log: &dyn ChangeLog, version: SchemaVersion) -> Result<InfoSchema> {
	let entries = log.changes_up_to(version)?;
	debug!(version = version.0, entries = entries.len(), "rebuilding snapshot from history");
	replay(entries)
}

/// Rebuild the most recent snapshot committed at or before
/// `timestamp_ms`.
pub fn rebuild_at_timestamp(log: &dyn ChangeLog, timestamp_ms: u64) -> Result<InfoSchema> {
	let entries = log.changes_at_or_before(timestamp_ms)?;
	debug!(timestamp_ms, entries = entries.len(), "rebuilding snapshot from history");
	replay(entries)
}

fn replay(entries: Vec<HistoryEntry>) -> Result<InfoSchema> {
	let mut builder = InfoSchemaBuilder::empty();
	let mut version = SchemaVersion::ZERO;
	let mut timestamp_ms = 0;
	for entry in entries {
		builder.apply(&entry.change)?;
		version = entry.version;
		timestamp_ms = entry.timestamp_ms;
	}
	Ok(builder.build(version, timestamp_ms))
}

#[cfg(test)]
mod tests {
	use tessera_core::{JobId, SchemaChange, SchemaId, TableId};
	use crate::test_support::{test_schema, test_table};

	use super::*;

	/// Fixed history standing in for the persisted job log.
	struct FixedLog(Vec<HistoryEntry>);

	impl ChangeLog for FixedLog {
		fn changes_up_to(&self, version: SchemaVersion) -> tessera_core::Result<Vec<HistoryEntry>> {
			Ok(self.0.iter().filter(|e| e.version <= version).cloned().collect())
		}

		fn changes_at_or_before(
			&self,
			timestamp_ms: u64,
		) -> tessera_core::Result<Vec<HistoryEntry>> {
			Ok(self.0.iter().filter(|e| e.timestamp_ms <= timestamp_ms).cloned().collect())
		}

		fn latest_version(&self) -> tessera_core::Result<SchemaVersion> {
			Ok(self.0.last().map(|e| e.version).unwrap_or(SchemaVersion::ZERO))
		}
	}

	fn history() -> FixedLog {
		FixedLog(vec![
			HistoryEntry {
				version: SchemaVersion(1),
				timestamp_ms: 100,
				job: JobId(1),
				change: SchemaChange::CreateSchema { def: test_schema(1, "app") },
			},
			HistoryEntry {
				version: SchemaVersion(2),
				timestamp_ms: 200,
				job: JobId(2),
				change: SchemaChange::CreateTable { def: test_table(1, 1, "t1") },
			},
			HistoryEntry {
				version: SchemaVersion(3),
				timestamp_ms: 300,
				job: JobId(3),
				change: SchemaChange::RenameTable {
					id: TableId(1),
					to: "t2".into(),
				},
			},
		])
	}

	#[test]
	fn test_rebuild_at_version() {
		let log = history();

		let snapshot = rebuild_at_version(&log, SchemaVersion(2)).unwrap();
		assert_eq!(snapshot.version(), SchemaVersion(2));
		assert!(snapshot.table_by_name(SchemaId(1), "t1").is_some());

		let snapshot = rebuild_at_version(&log, SchemaVersion(3)).unwrap();
		assert!(snapshot.table_by_name(SchemaId(1), "t1").is_none());
		assert!(snapshot.table_by_name(SchemaId(1), "t2").is_some());
	}

	#[test]
	fn test_rebuild_at_timestamp() {
		let log = history();

		// Between the table creation and the rename
		let snapshot = rebuild_at_timestamp(&log, 250).unwrap();
		assert_eq!(snapshot.version(), SchemaVersion(2));
		assert!(snapshot.table_by_name(SchemaId(1), "t1").is_some());

		// Before anything existed
		let snapshot = rebuild_at_timestamp(&log, 50).unwrap();
		assert_eq!(snapshot.version(), SchemaVersion::ZERO);
		assert!(snapshot.schema_by_name("app").is_none());
	}
}
