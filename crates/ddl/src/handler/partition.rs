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

pub(crate) fn add_partition(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::AddPartition { partition } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;
	if table.partition(&partition.name).is_some() {
		return Err(ValidationError::DuplicatePartition {
			table: table.name.clone(),
			partition: partition.name.clone(),
		}
		.into());
	}
	Ok(single_phase(SchemaChange::AddPartition {
		table: job.table_id,
		def: partition.clone(),
	}))
}

pub(crate) fn drop_partition(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::DropPartition { partition } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;
	if table.partition(partition).is_none() {
		return Err(ValidationError::UnknownPartition {
			table: table.name.clone(),
			partition: partition.clone(),
		}
		.into());
	}
	Ok(single_phase(SchemaChange::DropPartition {
		table: job.table_id,
		name: partition.clone(),
	}))
}

pub(crate) fn truncate_partition(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::TruncatePartition { partition } = &job.args else {
		return Err(args_mismatch(job));
	};
	let table = require_table(snapshot, job)?;
	if table.partition(partition).is_none() {
		return Err(ValidationError::UnknownPartition {
			table: table.name.clone(),
			partition: partition.clone(),
		}
		.into());
	}
	Ok(single_phase(SchemaChange::TruncatePartition {
		table: job.table_id,
		name: partition.clone(),
	}))
}
