// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_catalog::InfoSchema;
use tessera_core::{DdlJob, Error, JobArgs, SchemaChange, def::SchemaState};

use crate::{
	DdlError, Result, ValidationError,
	handler::{Backfill, Step, args_mismatch, require_table},
};

/// Add index ladder: `Absent → DeleteOnly → WriteOnly → WriteReorg →
/// Public`. The final step backfills entries for existing rows through
/// the storage collaborator before the index becomes read-visible.
pub(crate) fn add_index(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::AddIndex { index } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;

	match job.schema_state {
		SchemaState::Absent => {
			if table.index(&index.name).is_some() {
				return Err(ValidationError::DuplicateIndex {
					table: table.name.clone(),
					index: index.name.clone(),
				}
				.into());
			}
			for column in &index.columns {
				if table.column(column).is_none() {
					return Err(ValidationError::UnknownColumn {
						table: table.name.clone(),
						column: column.clone(),
					}
					.into());
				}
			}
			let mut def = table.clone();
			let mut index = index.clone();
			index.state = SchemaState::DeleteOnly;
			def.indexes.push(index);
			Ok(Step {
				change: SchemaChange::SetTable { def },
				schema_state: SchemaState::DeleteOnly,
				backfill: None,
				terminal: false,
			})
		}
		SchemaState::DeleteOnly => {
			set_index_state(snapshot, job, &index.name, SchemaState::WriteOnly, None, false)
		}
		SchemaState::WriteOnly => {
			set_index_state(snapshot, job, &index.name, SchemaState::WriteReorg, None, false)
		}
		SchemaState::WriteReorg => set_index_state(
			snapshot,
			job,
			&index.name,
			SchemaState::Public,
			Some(Backfill::IndexFill {
				table: job.table_id,
				index: index.name.clone(),
			}),
			true,
		),
		state => Err(ladder_corrupt(job, state)),
	}
}

/// Drop index ladder: `Public → WriteOnly → DeleteOnly → DeleteReorg →
/// removed`.
pub(crate) fn drop_index(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::DropIndex { index } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;

	match job.schema_state {
		SchemaState::Public => {
			if table.index(index).is_none() {
				return Err(ValidationError::UnknownIndex {
					table: table.name.clone(),
					index: index.clone(),
				}
				.into());
			}
			set_index_state(snapshot, job, index, SchemaState::WriteOnly, None, false)
		}
		SchemaState::WriteOnly => {
			set_index_state(snapshot, job, index, SchemaState::DeleteOnly, None, false)
		}
		SchemaState::DeleteOnly => {
			set_index_state(snapshot, job, index, SchemaState::DeleteReorg, None, false)
		}
		SchemaState::DeleteReorg => {
			let mut def = table.clone();
			def.indexes.retain(|i| i.name != *index);
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

pub(crate) fn rename_index(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::RenameIndex { from, to } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;
	if table.index(from).is_none() {
		return Err(ValidationError::UnknownIndex {
			table: table.name.clone(),
			index: from.clone(),
		}
		.into());
	}
	if table.index(to).is_some() {
		return Err(ValidationError::DuplicateIndex {
			table: table.name.clone(),
			index: to.clone(),
		}
		.into());
	}
	let mut def = table.clone();
	if let Some(index) = def.index_mut(from) {
		index.name = to.clone();
	}
	Ok(Step {
		change: SchemaChange::SetTable { def },
		schema_state: SchemaState::Public,
		backfill: None,
		terminal: true,
	})
}

pub(crate) fn alter_visibility(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::AlterIndexVisibility { index, invisible } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;
	if table.index(index).is_none() {
		return Err(ValidationError::UnknownIndex {
			table: table.name.clone(),
			index: index.clone(),
		}
		.into());
	}
	let mut def = table.clone();
	if let Some(target) = def.index_mut(index) {
		target.visible = !invisible;
	}
	Ok(Step {
		change: SchemaChange::SetTable { def },
		schema_state: SchemaState::Public,
		backfill: None,
		terminal: true,
	})
}

pub(crate) fn rollback_add_index(snapshot: &InfoSchema, job: &DdlJob) -> Result<Option<Step>> {
	let JobArgs::AddIndex { index } = &job.args else {
		return Err(args_mismatch(job));
	};
	let step = match job.schema_state {
		// Nothing applied yet
		SchemaState::Absent => return Ok(None),
		SchemaState::WriteReorg => {
			set_index_state(snapshot, job, &index.name, SchemaState::WriteOnly, None, false)?
		}
		SchemaState::WriteOnly => {
			set_index_state(snapshot, job, &index.name, SchemaState::DeleteOnly, None, false)?
		}
		SchemaState::DeleteOnly => {
			let table = require_table(snapshot, job)?;
			let mut def = table.clone();
			def.indexes.retain(|i| i.name != index.name);
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

pub(crate) fn rollback_drop_index(snapshot: &InfoSchema, job: &DdlJob) -> Result<Option<Step>> {
	let JobArgs::DropIndex { index } = &job.args else {
		return Err(args_mismatch(job));
	};
	let step = match job.schema_state {
		// Nothing applied yet
		SchemaState::Public => return Ok(None),
		SchemaState::DeleteReorg => {
			set_index_state(snapshot, job, index, SchemaState::DeleteOnly, None, false)?
		}
		SchemaState::DeleteOnly => {
			set_index_state(snapshot, job, index, SchemaState::WriteOnly, None, false)?
		}
		SchemaState::WriteOnly => {
			set_index_state(snapshot, job, index, SchemaState::Public, None, true)?
		}
		state => return Err(ladder_corrupt(job, state)),
	};
	Ok(Some(step))
}

fn set_index_state(
	snapshot: &InfoSchema,
	job: &DdlJob,
	index: &str,
	state: SchemaState,
	backfill: Option<Backfill>,
	terminal: bool,
) -> Result<Step> {
	let table = require_table(snapshot, job)?;
	let mut def = table.clone();
	let def_id = def.id;
	let target = def.index_mut(index).ok_or_else(|| {
		DdlError::Store(Error::Storage(format!(
			"index '{index}' vanished mid-ladder from table {}",
			def_id
		)))
	})?;
	target.state = state;
	Ok(Step {
		change: SchemaChange::SetTable { def },
		schema_state: state,
		backfill,
		terminal,
	})
}

fn ladder_corrupt(job: &DdlJob, state: SchemaState) -> DdlError {
	DdlError::Store(Error::Storage(format!(
		"job {} ({}) persisted in impossible state {state}",
		job.id, job.action
	)))
}
