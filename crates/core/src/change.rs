// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use serde::{Deserialize, Serialize};

use crate::{
	def::{PartitionDef, SchemaDef, SequenceDef, TableDef},
	id::{JobId, SchemaId, SequenceId, TableId},
	version::SchemaVersion,
};

/// One committed catalog mutation. Applying a `SchemaChange` to the
/// snapshot at version `v` is the only way version `v + 1` comes into
/// existence.
///
/// Multi-phase actions (column and index ladders) publish a `SetTable`
/// carrying the full post-step definition, so replaying the history is
/// exact regardless of how the step was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaChange {
	CreateSchema {
		def: SchemaDef,
	},
	DropSchema {
		id: SchemaId,
	},
	CreateTable {
		def: TableDef,
	},
	DropTable {
		id: TableId,
	},
	/// Wholesale replacement of a table definition; used by the
	/// column/index state ladders where the owner computes the next
	/// definition.
	SetTable {
		def: TableDef,
	},
	RenameTable {
		id: TableId,
		to: String,
	},
	TruncateTable {
		id: TableId,
	},
	SetTableComment {
		id: TableId,
		comment: Option<String>,
	},
	RebaseAutoIncrement {
		id: TableId,
		base: u64,
	},
	AddPartition {
		table: TableId,
		def: PartitionDef,
	},
	DropPartition {
		table: TableId,
		name: String,
	},
	TruncatePartition {
		table: TableId,
		name: String,
	},
	CreateSequence {
		def: SequenceDef,
	},
	DropSequence {
		id: SequenceId,
	},
}

/// Permanent record of one applied change; the ordered log of entries is
/// the source of truth for out-of-core snapshot rebuilds and flashback
/// reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
	pub version: SchemaVersion,
	pub timestamp_ms: u64,
	pub job: JobId,
	pub change: SchemaChange,
}
