// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_catalog::InfoSchema;
use tessera_core::{DdlJob, JobArgs, SchemaChange, def::SchemaState};

use crate::{
	Result, ValidationError,
	handler::{Step, args_mismatch, require_table},
};

fn single_phase(change: SchemaChange) -> Step {
	Step {
		change,
		schema_state: SchemaState::Public,
		backfill: None,
		terminal: true,
	}
}

pub(crate) fn create_table(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::CreateTable { def } = &job.args else {
		return Err(args_mismatch(job));
	};
	if snapshot.schema(job.schema_id).is_none() {
		return Err(ValidationError::UnknownSchema(job.schema_name.clone()).into());
	}
	if snapshot.table_by_name(job.schema_id, &def.name).is_some() {
		return Err(ValidationError::DuplicateTable(def.name.clone()).into());
	}
	Ok(single_phase(SchemaChange::CreateTable { def: def.clone() }))
}

pub(crate) fn drop_table(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	require_table(snapshot, job)?;
	Ok(single_phase(SchemaChange::DropTable { id: job.table_id }))
}

pub(crate) fn truncate_table(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	require_table(snapshot, job)?;
	Ok(single_phase(SchemaChange::TruncateTable { id: job.table_id }))
}

pub(crate) fn rename_table(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::RenameTable { to } = &job.args else {
		return Err(args_mismatch(job));
	};
	require_table(snapshot, job)?;
	if snapshot.table_by_name(job.schema_id, to).is_some() {
		return Err(ValidationError::DuplicateTable(to.clone()).into());
	}
	Ok(single_phase(SchemaChange::RenameTable {
		id: job.table_id,
		to: to.clone(),
	}))
}

pub(crate) fn alter_comment(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::AlterTableComment { comment } = &job.args else {
		return Err(args_mismatch(job));
	};
	require_table(snapshot, job)?;
	Ok(single_phase(SchemaChange::SetTableComment {
		id: job.table_id,
		comment: comment.clone(),
	}))
}

pub(crate) fn rebase_auto_increment(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::RebaseAutoIncrement { base } = &job.args else {
		return Err(args_mismatch(job));
	};
	require_table(snapshot, job)?;
	Ok(single_phase(SchemaChange::RebaseAutoIncrement {
		id: job.table_id,
		base: *base,
	}))
}
