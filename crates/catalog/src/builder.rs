// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::{BTreeMap, HashMap};

use tessera_core::{
	Error, SchemaChange, SchemaId, SchemaVersion, SequenceId, TableId,
	def::{SchemaDef, SequenceDef, TableDef},
};

use crate::{InfoSchema, Result};

/// Builds the snapshot at version `v + 1` by applying one change to the
/// snapshot at `v`.
///
/// An apply failure means the change log and the snapshot disagree —
/// a store-level inconsistency, not a user error; user-level validation
/// happens before a change is ever committed.
pub struct InfoSchemaBuilder {
	schemas: BTreeMap<SchemaId, SchemaDef>,
	tables: BTreeMap<TableId, TableDef>,
	sequences: BTreeMap<SequenceId, SequenceDef>,
}

impl InfoSchemaBuilder {
	/// Start from the empty catalog at version zero.
	pub fn empty() -> Self {
		Self {
			schemas: BTreeMap::new(),
			tables: BTreeMap::new(),
			sequences: BTreeMap::new(),
		}
	}

	pub fn from_snapshot(snapshot: &InfoSchema) -> Self {
		Self {
			schemas: snapshot.schemas.clone(),
			tables: snapshot.tables.clone(),
			sequences: snapshot.sequences.clone(),
		}
	}

	pub fn apply(&mut self, change: &SchemaChange) -> Result<()> {
		match change {
			SchemaChange::CreateSchema { def } => {
				self.schemas.insert(def.id, def.clone());
			}
			SchemaChange::DropSchema { id } => {
				self.schemas.remove(id).ok_or_else(|| missing_schema(*id))?;
				// Dropping a schema cascades to its tables and
				// sequences.
				self.tables.retain(|_, t| t.schema != *id);
				self.sequences.retain(|_, s| s.schema != *id);
			}
			SchemaChange::CreateTable { def } => {
				self.tables.insert(def.id, def.clone());
			}
			SchemaChange::DropTable { id } => {
				self.tables.remove(id).ok_or_else(|| missing_table(*id))?;
			}
			SchemaChange::SetTable { def } => {
				self.tables.insert(def.id, def.clone());
			}
			SchemaChange::RenameTable { id, to } => {
				let table = self.table_mut(*id)?;
				table.name = to.clone();
			}
			SchemaChange::TruncateTable { id } => {
				// Row data removal is the storage collaborator's
				// business; metadata-wise the allocator restarts.
				let table = self.table_mut(*id)?;
				table.auto_increment = 1;
			}
			SchemaChange::SetTableComment { id, comment } => {
				let table = self.table_mut(*id)?;
				table.comment = comment.clone();
			}
			SchemaChange::RebaseAutoIncrement { id, base } => {
				let table = self.table_mut(*id)?;
				table.auto_increment = table.auto_increment.max(*base);
			}
			SchemaChange::AddPartition { table, def } => {
				let table = self.table_mut(*table)?;
				table.partitions.push(def.clone());
			}
			SchemaChange::DropPartition { table, name } => {
				let table = self.table_mut(*table)?;
				table.partitions.retain(|p| p.name != *name);
			}
			SchemaChange::TruncatePartition { .. } => {
				// Pure data operation; the schema shape is unchanged
				// but the version bump still fences concurrent
				// readers off the old row set.
			}
			SchemaChange::CreateSequence { def } => {
				self.sequences.insert(def.id, def.clone());
			}
			SchemaChange::DropSequence { id } => {
				self.sequences.remove(id).ok_or_else(|| {
					Error::NotFound(format!("sequence {id} not in snapshot"))
				})?;
			}
		}
		Ok(())
	}

	pub fn build(self, version: SchemaVersion, timestamp_ms: u64) -> InfoSchema {
		let mut schemas_by_name = HashMap::new();
		for schema in self.schemas.values() {
			schemas_by_name.insert(schema.name.clone(), schema.id);
		}
		let mut tables_by_name = HashMap::new();
		for table in self.tables.values() {
			tables_by_name.insert((table.schema, table.name.clone()), table.id);
		}
		let mut sequences_by_name = HashMap::new();
		for sequence in self.sequences.values() {
			sequences_by_name.insert((sequence.schema, sequence.name.clone()), sequence.id);
		}
		InfoSchema {
			version,
			timestamp_ms,
			schemas: self.schemas,
			schemas_by_name,
			tables: self.tables,
			tables_by_name,
			sequences: self.sequences,
			sequences_by_name,
		}
	}

	fn table_mut(&mut self, id: TableId) -> Result<&mut TableDef> {
		self.tables.get_mut(&id).ok_or_else(|| missing_table(id))
	}
}

fn missing_table(id: TableId) -> Error {
	Error::NotFound(format!("table {id} not in snapshot"))
}

fn missing_schema(id: SchemaId) -> Error {
	Error::NotFound(format!("schema {id} not in snapshot"))
}

#[cfg(test)]
mod tests {
	use tessera_core::def::PartitionDef;
	use crate::test_support::{test_schema, test_table};

	use super::*;

	#[test]
	fn test_apply_create_and_rename_table() {
		let mut builder = InfoSchemaBuilder::empty();
		builder.apply(&SchemaChange::CreateSchema { def: test_schema(1, "app") }).unwrap();
		builder.apply(&SchemaChange::CreateTable { def: test_table(1, 1, "t1") }).unwrap();
		let v10 = builder.build(SchemaVersion(10), 1000);
		assert_eq!(v10.table_by_name(SchemaId(1), "t1").unwrap().id, TableId(1));

		let mut builder = InfoSchemaBuilder::from_snapshot(&v10);
		builder.apply(&SchemaChange::RenameTable { id: TableId(1), to: "t2".into() })
			.unwrap();
		let v11 = builder.build(SchemaVersion(11), 2000);

		// The old snapshot still shows the old name
		assert!(v10.table_by_name(SchemaId(1), "t1").is_some());
		assert!(v11.table_by_name(SchemaId(1), "t1").is_none());
		assert_eq!(v11.table_by_name(SchemaId(1), "t2").unwrap().id, TableId(1));
	}

	#[test]
	fn test_apply_drop_schema_cascades() {
		let mut builder = InfoSchemaBuilder::empty();
		builder.apply(&SchemaChange::CreateSchema { def: test_schema(1, "app") }).unwrap();
		builder.apply(&SchemaChange::CreateTable { def: test_table(1, 1, "t1") }).unwrap();
		builder.apply(&SchemaChange::DropSchema { id: SchemaId(1) }).unwrap();
		let snapshot = builder.build(SchemaVersion(3), 0);

		assert!(snapshot.schema(SchemaId(1)).is_none());
		assert!(snapshot.table(TableId(1)).is_none());
	}

	#[test]
	fn test_apply_partitions() {
		let mut builder = InfoSchemaBuilder::empty();
		builder.apply(&SchemaChange::CreateTable { def: test_table(1, 1, "t1") }).unwrap();
		builder.apply(&SchemaChange::AddPartition {
			table: TableId(1),
			def: PartitionDef {
				name: "p0".into(),
				upper_bound: None,
			},
		})
		.unwrap();
		let snapshot = builder.build(SchemaVersion(2), 0);
		assert!(snapshot.table(TableId(1)).unwrap().partition("p0").is_some());

		let mut builder = InfoSchemaBuilder::from_snapshot(&snapshot);
		builder.apply(&SchemaChange::DropPartition {
			table: TableId(1),
			name: "p0".into(),
		})
		.unwrap();
		let next = builder.build(SchemaVersion(3), 0);
		assert!(next.table(TableId(1)).unwrap().partition("p0").is_none());
	}

	#[test]
	fn test_apply_missing_table_is_inconsistency() {
		let mut builder = InfoSchemaBuilder::empty();
		let result = builder.apply(&SchemaChange::RenameTable {
			id: TableId(9),
			to: "x".into(),
		});
		assert!(matches!(result, Err(Error::NotFound(_))));
	}
}
