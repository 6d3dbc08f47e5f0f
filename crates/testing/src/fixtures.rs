// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_catalog::{InfoSchema, InfoSchemaBuilder};
use tessera_core::{
	ColumnId, IndexId, SchemaChange, SchemaId, SchemaVersion, SequenceId, TableId,
	def::{
		ColumnDef, ColumnIndex, IndexDef, SchemaDef, SchemaState, SequenceDef, TableDef, Type,
	},
};

pub fn test_schema(id: u64, name: &str) -> SchemaDef {
	SchemaDef {
		id: SchemaId(id),
		name: name.to_string(),
	}
}

pub fn test_column(id: u64, name: &str, ordinal: u16, ty: Type) -> ColumnDef {
	ColumnDef {
		id: ColumnId(id),
		name: name.to_string(),
		ty,
		nullable: false,
		default: None,
		index: ColumnIndex(ordinal),
		auto_increment: false,
		state: SchemaState::Public,
	}
}

/// A two-column table (`id` auto-increment, `name`), everything public.
pub fn test_table(table_id: u64, schema_id: u64, name: &str) -> TableDef {
	let mut id_column = test_column(1, "id", 0, Type::Int8);
	id_column.auto_increment = true;
	TableDef {
		id: TableId(table_id),
		schema: SchemaId(schema_id),
		name: name.to_string(),
		columns: vec![id_column, test_column(2, "name", 1, Type::Utf8)],
		indexes: vec![],
		partitions: vec![],
		auto_increment: 1,
		comment: None,
	}
}

pub fn test_index(id: u64, name: &str, columns: &[&str]) -> IndexDef {
	IndexDef {
		id: IndexId(id),
		name: name.to_string(),
		columns: columns.iter().map(|c| c.to_string()).collect(),
		unique: false,
		visible: true,
		state: SchemaState::Public,
	}
}

pub fn test_sequence(id: u64, schema_id: u64, name: &str) -> SequenceDef {
	SequenceDef {
		id: SequenceId(id),
		schema: SchemaId(schema_id),
		name: name.to_string(),
		start: 1,
		increment: 1,
		min_value: 1,
		max_value: i64::MAX,
		cache: 100,
		cycle: false,
	}
}

/// Snapshot holding the schema "app" (id `id`) with one table, built at
/// `version`. The timestamp tracks the version for ordering-sensitive
/// tests.
pub fn snapshot_with_table(id: u64, table_name: &str, version: u64) -> InfoSchema {
	let mut builder = InfoSchemaBuilder::empty();
	builder.apply(&SchemaChange::CreateSchema { def: test_schema(id, "app") })
		.expect("create schema");
	builder.apply(&SchemaChange::CreateTable { def: test_table(id, id, table_name) })
		.expect("create table");
	builder.build(SchemaVersion(version), version * 1000)
}
