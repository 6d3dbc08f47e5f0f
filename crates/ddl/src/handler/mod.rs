// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Per-action phase handlers.
//!
//! `next_step` derives the next phase purely from the snapshot and the
//! persisted job — no in-memory carry-over — so re-running it after an
//! owner failover resumes exactly where the last committed phase left
//! off. Validation happens on a job's first step only; later ladder
//! steps operate on state the first step established.

mod column;
mod index;
mod partition;
mod schema;
mod sequence;
mod table;

use tessera_catalog::InfoSchema;
use tessera_core::{
	ActionKind, DdlJob, SchemaChange, SchemaVersion, TableId,
	def::{SchemaState, TableDef},
};

use crate::{DdlError, Result, ValidationError};

/// One phase to execute: commit `change`, persist `schema_state` on the
/// job, and — for `terminal` steps — move the job to its terminal
/// state after the drain completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
	pub change: SchemaChange,
	pub schema_state: SchemaState,
	pub backfill: Option<Backfill>,
	pub terminal: bool,
}

/// Row-data work a phase performs through the storage collaborator
/// before its change is committed. Must be idempotent: a replayed phase
/// start re-runs it.
#[derive(Debug, Clone, PartialEq)]
pub enum Backfill {
	IndexFill {
		table: TableId,
		index: String,
	},
}

/// Compute the next phase of `job` against the latest snapshot.
pub fn next_step(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	match job.action {
		ActionKind::CreateSchema => schema::create_schema(snapshot, job),
		ActionKind::DropSchema => schema::drop_schema(snapshot, job),
		ActionKind::CreateTable => table::create_table(snapshot, job),
		ActionKind::DropTable => table::drop_table(snapshot, job),
		ActionKind::TruncateTable => table::truncate_table(snapshot, job),
		ActionKind::RenameTable => table::rename_table(snapshot, job),
		ActionKind::AlterTableComment => table::alter_comment(snapshot, job),
		ActionKind::RebaseAutoIncrement => table::rebase_auto_increment(snapshot, job),
		ActionKind::AddColumn => column::add_column(snapshot, job),
		ActionKind::DropColumn => column::drop_column(snapshot, job),
		ActionKind::AddIndex => index::add_index(snapshot, job),
		ActionKind::DropIndex => index::drop_index(snapshot, job),
		ActionKind::RenameIndex => index::rename_index(snapshot, job),
		ActionKind::AlterIndexVisibility => index::alter_visibility(snapshot, job),
		ActionKind::AddTablePartition => partition::add_partition(snapshot, job),
		ActionKind::DropTablePartition => partition::drop_partition(snapshot, job),
		ActionKind::TruncateTablePartition => partition::truncate_partition(snapshot, job),
		ActionKind::CreateSequence => sequence::create_sequence(snapshot, job),
		ActionKind::DropSequence => sequence::drop_sequence(snapshot, job),
	}
}

/// Compute the next rollback phase for a cancelled job, walking the
/// state ladder back to where the job started. `None` means nothing was
/// applied — the job cancels without rollback.
pub fn rollback_step(snapshot: &InfoSchema, job: &DdlJob) -> Result<Option<Step>> {
	match job.action {
		ActionKind::AddColumn => column::rollback_add_column(snapshot, job),
		ActionKind::DropColumn => column::rollback_drop_column(snapshot, job),
		ActionKind::AddIndex => index::rollback_add_index(snapshot, job),
		ActionKind::DropIndex => index::rollback_drop_index(snapshot, job),
		// Single-phase actions have nothing applied before their only
		// commit, which is also their terminal step.
		_ => Ok(None),
	}
}

/// Whether every phase of `job` has already been committed — the job
/// was resumed after a failover that interrupted it between its final
/// commit and the terminal-state write.
pub fn phase_complete(job: &DdlJob) -> bool {
	match job.action {
		ActionKind::AddColumn | ActionKind::AddIndex => {
			job.schema_state == SchemaState::Public
		}
		ActionKind::DropColumn | ActionKind::DropIndex => {
			job.schema_state == SchemaState::Absent
		}
		_ => job.version > SchemaVersion::ZERO,
	}
}

/// The job's table in the snapshot. Missing on a first step it is a
/// user error; missing mid-ladder it is store corruption, but the
/// distinction does not matter to the caller — the job cancels either
/// way.
pub(crate) fn require_table<'a>(snapshot: &'a InfoSchema, job: &DdlJob) -> Result<&'a TableDef> {
	snapshot.table(job.table_id)
		.ok_or_else(|| ValidationError::UnknownTable(job.table_name.clone()).into())
}

pub(crate) fn args_mismatch(job: &DdlJob) -> DdlError {
	ValidationError::ArgumentMismatch(format!("job {} ({})", job.id, job.action)).into()
}
