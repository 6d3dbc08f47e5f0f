// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	fmt,
	fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};

use crate::{
	def::{ColumnDef, IndexDef, PartitionDef, SchemaDef, SchemaState, SequenceDef, TableDef},
	id::{JobId, NodeId, SchemaId, TableId},
	version::SchemaVersion,
};

/// The kind of schema change a job performs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
	CreateSchema,
	DropSchema,
	CreateTable,
	DropTable,
	TruncateTable,
	RenameTable,
	AddColumn,
	DropColumn,
	AddIndex,
	DropIndex,
	RenameIndex,
	AlterIndexVisibility,
	AddTablePartition,
	DropTablePartition,
	TruncateTablePartition,
	RebaseAutoIncrement,
	AlterTableComment,
	CreateSequence,
	DropSequence,
}

impl ActionKind {
	/// Whether the action walks a multi-step `SchemaState` ladder, each
	/// step publishing its own version, rather than committing in one
	/// step.
	pub fn is_multi_phase(&self) -> bool {
		matches!(
			self,
			ActionKind::AddColumn
				| ActionKind::DropColumn
				| ActionKind::AddIndex
				| ActionKind::DropIndex
		)
	}

	/// Ladder position a freshly submitted job starts from: destructive
	/// ladders walk down from `Public`, everything else up from
	/// `Absent`.
	pub fn initial_state(&self) -> SchemaState {
		match self {
			ActionKind::DropColumn | ActionKind::DropIndex => SchemaState::Public,
			_ => SchemaState::Absent,
		}
	}
}

impl Display for ActionKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			ActionKind::CreateSchema => f.write_str("create schema"),
			ActionKind::DropSchema => f.write_str("drop schema"),
			ActionKind::CreateTable => f.write_str("create table"),
			ActionKind::DropTable => f.write_str("drop table"),
			ActionKind::TruncateTable => f.write_str("truncate table"),
			ActionKind::RenameTable => f.write_str("rename table"),
			ActionKind::AddColumn => f.write_str("add column"),
			ActionKind::DropColumn => f.write_str("drop column"),
			ActionKind::AddIndex => f.write_str("add index"),
			ActionKind::DropIndex => f.write_str("drop index"),
			ActionKind::RenameIndex => f.write_str("rename index"),
			ActionKind::AlterIndexVisibility => f.write_str("alter index visibility"),
			ActionKind::AddTablePartition => f.write_str("add table partition"),
			ActionKind::DropTablePartition => f.write_str("drop table partition"),
			ActionKind::TruncateTablePartition => {
				f.write_str("truncate table partition")
			}
			ActionKind::RebaseAutoIncrement => f.write_str("rebase auto-increment"),
			ActionKind::AlterTableComment => f.write_str("alter table comment"),
			ActionKind::CreateSequence => f.write_str("create sequence"),
			ActionKind::DropSequence => f.write_str("drop sequence"),
		}
	}
}

/// Typed payload of a job, one variant per action kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobArgs {
	None,
	CreateSchema {
		def: SchemaDef,
	},
	CreateTable {
		def: TableDef,
	},
	RenameTable {
		to: String,
	},
	AddColumn {
		column: ColumnDef,
	},
	DropColumn {
		column: String,
	},
	AddIndex {
		index: IndexDef,
	},
	DropIndex {
		index: String,
	},
	RenameIndex {
		from: String,
		to: String,
	},
	AlterIndexVisibility {
		index: String,
		invisible: bool,
	},
	AddPartition {
		partition: PartitionDef,
	},
	DropPartition {
		partition: String,
	},
	TruncatePartition {
		partition: String,
	},
	RebaseAutoIncrement {
		base: u64,
	},
	AlterTableComment {
		comment: Option<String>,
	},
	CreateSequence {
		def: SequenceDef,
	},
	DropSequence {
		sequence: String,
	},
}

/// Overall lifecycle state of a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
	/// Appended to the store, not yet picked up by the owner.
	Queued,
	/// Claimed by the current owner and being driven through its phases.
	Running,
	/// All phases committed and drained.
	Done,
	/// Cancelled before any destructive step was applied.
	Cancelled,
	/// Cancelled after partial application; every applied step has been
	/// reverted by its own versioned change.
	RollbackDone,
}

impl JobState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, JobState::Done | JobState::Cancelled | JobState::RollbackDone)
	}
}

/// A persisted schema-change request.
///
/// Owned exclusively by the job executor while running; every field the
/// executor mutates is written back to the job store before the next
/// phase begins, so a new owner can resume from the persisted state
/// alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlJob {
	pub id: JobId,
	pub schema_id: SchemaId,
	pub schema_name: String,
	pub table_id: TableId,
	pub table_name: String,
	pub action: ActionKind,
	pub args: JobArgs,
	/// Ladder position for multi-phase actions.
	pub schema_state: SchemaState,
	pub state: JobState,
	pub error: Option<String>,
	/// Latest schema version at the time the job was submitted.
	pub snapshot_version: SchemaVersion,
	/// Last version a phase of this job produced, `ZERO` before the
	/// first phase commits.
	pub version: SchemaVersion,
	/// Claim field, compare-and-swapped by the owner.
	pub owner: Option<NodeId>,
	/// Set by administrative cancellation; honored at phase boundaries.
	pub cancel_requested: bool,
}

impl DdlJob {
	pub fn is_finished(&self) -> bool {
		self.state.is_terminal()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_multi_phase_actions() {
		assert!(ActionKind::AddColumn.is_multi_phase());
		assert!(ActionKind::DropIndex.is_multi_phase());
		assert!(!ActionKind::RenameTable.is_multi_phase());
		assert!(!ActionKind::CreateTable.is_multi_phase());
	}

	#[test]
	fn test_terminal_states() {
		assert!(JobState::Done.is_terminal());
		assert!(JobState::Cancelled.is_terminal());
		assert!(JobState::RollbackDone.is_terminal());
		assert!(!JobState::Queued.is_terminal());
		assert!(!JobState::Running.is_terminal());
	}
}
