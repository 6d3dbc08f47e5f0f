// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::{BTreeMap, HashMap};

use tessera_core::{
	SchemaId, SchemaVersion, SequenceId, TableId,
	def::{SchemaDef, SequenceDef, TableDef},
};

/// An immutable snapshot of all schema metadata at one version.
///
/// Never mutated after construction; a new version is always a new
/// snapshot built by [`crate::InfoSchemaBuilder`] from the previous one
/// plus exactly one committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoSchema {
	pub(crate) version: SchemaVersion,
	pub(crate) timestamp_ms: u64,
	pub(crate) schemas: BTreeMap<SchemaId, SchemaDef>,
	pub(crate) schemas_by_name: HashMap<String, SchemaId>,
	pub(crate) tables: BTreeMap<TableId, TableDef>,
	pub(crate) tables_by_name: HashMap<(SchemaId, String), TableId>,
	pub(crate) sequences: BTreeMap<SequenceId, SequenceDef>,
	pub(crate) sequences_by_name: HashMap<(SchemaId, String), SequenceId>,
}

impl InfoSchema {
	pub fn version(&self) -> SchemaVersion {
		self.version
	}

	pub fn timestamp_ms(&self) -> u64 {
		self.timestamp_ms
	}

	pub fn schema(&self, id: SchemaId) -> Option<&SchemaDef> {
		self.schemas.get(&id)
	}

	pub fn schema_by_name(&self, name: &str) -> Option<&SchemaDef> {
		self.schemas_by_name.get(name).and_then(|id| self.schemas.get(id))
	}

	pub fn table(&self, id: TableId) -> Option<&TableDef> {
		self.tables.get(&id)
	}

	pub fn table_by_name(&self, schema: SchemaId, name: &str) -> Option<&TableDef> {
		self.tables_by_name
			.get(&(schema, name.to_string()))
			.and_then(|id| self.tables.get(id))
	}

	pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
		self.tables.values()
	}

	pub fn sequence(&self, id: SequenceId) -> Option<&SequenceDef> {
		self.sequences.get(&id)
	}

	pub fn sequence_by_name(&self, schema: SchemaId, name: &str) -> Option<&SequenceDef> {
		self.sequences_by_name
			.get(&(schema, name.to_string()))
			.and_then(|id| self.sequences.get(id))
	}
}
