// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_catalog::InfoSchema;
use tessera_core::{DdlJob, Error, JobArgs, SchemaChange, def::SchemaState};

use crate::{
	DdlError, Result, ValidationError,
	handler::{Step, args_mismatch, require_table},
};

/// Add column ladder: `Absent → DeleteOnly → WriteOnly → WriteReorg →
/// Public`. The column becomes visible to writes two versions before it
/// becomes visible to reads, so no two adjacent versions ever disagree
/// on whether a write must populate it.
pub(crate) fn add_column(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::AddColumn { column } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;

	match job.schema_state {
		SchemaState::Absent => {
			if table.column(&column.name).is_some() {
				return Err(ValidationError::DuplicateColumn {
					table: table.name.clone(),
					column: column.name.clone(),
				}
				.into());
			}
			let mut def = table.clone();
			let mut column = column.clone();
			column.state = SchemaState::DeleteOnly;
			def.columns.push(column);
			Ok(Step {
				change: SchemaChange::SetTable { def },
				schema_state: SchemaState::DeleteOnly,
				backfill: None,
				terminal: false,
			})
		}
		SchemaState::DeleteOnly => set_column_state(snapshot, job, &column.name, SchemaState::WriteOnly, false),
		SchemaState::WriteOnly => set_column_state(snapshot, job, &column.name, SchemaState::WriteReorg, false),
		SchemaState::WriteReorg => set_column_state(snapshot, job, &column.name, SchemaState::Public, true),
		state => Err(ladder_corrupt(job, state)),
	}
}

/// Drop column ladder: `Public → WriteOnly → DeleteOnly → DeleteReorg →
/// removed`. Reads stop seeing the column before writes stop
/// maintaining it.
pub(crate) fn drop_column(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::DropColumn { column } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;

	match job.schema_state {
		SchemaState::Public => {
			if table.column(column).is_none() {
				return Err(ValidationError::UnknownColumn {
					table: table.name.clone(),
					column: column.clone(),
				}
				.into());
			}
			set_column_state(snapshot, job, column, SchemaState::WriteOnly, false)
		}
		SchemaState::WriteOnly => set_column_state(snapshot, job, column, SchemaState::DeleteOnly, false),
		SchemaState::DeleteOnly => set_column_state(snapshot, job, column, SchemaState::DeleteReorg, false),
		SchemaState::DeleteReorg => {
			let mut def = table.clone();
			def.columns.retain(|c| c.name != *column);
			Ok(Step {
				change: SchemaChange::SetTable { def },
				schema_state: SchemaState::Absent,
				backfill: None,
				terminal: true,
			})
		}
		state => Err(ladder_corrupt(job, state)),
	}
}

pub(crate) fn rollback_add_column(snapshot: &InfoSchema, job: &DdlJob) -> Result<Option<Step>> {
	let JobArgs::AddColumn { column } = &job.args else {
		return Err(args_mismatch(job));
	};
	let step = match job.schema_state {
		// Nothing applied yet
		SchemaState::Absent => return Ok(None),
		SchemaState::WriteReorg => {
			set_column_state(snapshot, job, &column.name, SchemaState::WriteOnly, false)?
		}
		SchemaState::WriteOnly => {
			set_column_state(snapshot, job, &column.name, SchemaState::DeleteOnly, false)?
		}
		SchemaState::DeleteOnly => {
			let table = require_table(snapshot, job)?;
			let mut def = table.clone();
			def.columns.retain(|c| c.name != column.name);
			Step {
				change: SchemaChange::SetTable { def },
				schema_state: SchemaState::Absent,
				backfill: None,
				terminal: true,
			}
		}
		state => return Err(ladder_corrupt(job, state)),
	};
	Ok(Some(step))
}

pub(crate) fn rollback_drop_column(snapshot: &InfoSchema, job: &DdlJob) -> Result<Option<Step>> {
	let JobArgs::DropColumn { column } = &job.args else {
		return Err(args_mismatch(job));
	};
	let step = match job.schema_state {
		// Nothing applied yet
		SchemaState::Public => return Ok(None),
		SchemaState::DeleteReorg => {
			set_column_state(snapshot, job, column, SchemaState::DeleteOnly, false)?
		}
		SchemaState::DeleteOnly => {
			set_column_state(snapshot, job, column, SchemaState::WriteOnly, false)?
		}
		SchemaState::WriteOnly => {
			set_column_state(snapshot, job, column, SchemaState::Public, true)?
		}
		state => return Err(ladder_corrupt(job, state)),
	};
	Ok(Some(step))
}

fn set_column_state(
	snapshot: &InfoSchema,
	job: &DdlJob,
	column: &str,
	state: SchemaState,
	terminal: bool,
) -> Result<Step> {
	let table = require_table(snapshot, job)?;
	let mut def = table.clone();
	let def_id = def.id;
	let target = def.column_mut(column).ok_or_else(|| {
		DdlError::Store(Error::Storage(format!(
			"column '{column}' vanished mid-ladder from table {}",
			def_id
		)))
	})?;
	target.state = state;
	Ok(Step {
		change: SchemaChange::SetTable { def },
		schema_state: state,
		backfill: None,
		terminal,
	})
}

fn ladder_corrupt(job: &DdlJob, state: SchemaState) -> DdlError {
	DdlError::Store(Error::Storage(format!(
		"job {} ({}) persisted in impossible state {state}",
		job.id, job.action
	)))
}
