// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_catalog::InfoSchema;
use tessera_core::{DdlJob, JobArgs, SchemaChange, def::SchemaState};

use crate::{
	Result, ValidationError,
	handler::{Step, args_mismatch},
};

pub(crate) fn create_schema(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::CreateSchema { def } = &job.args else {
		return Err(args_mismatch(job));
	};
	if snapshot.schema_by_name(&def.name).is_some() {
		return Err(ValidationError::DuplicateSchema(def.name.clone()).into());
	}
	Ok(Step {
		change: SchemaChange::CreateSchema { def: def.clone() },
		schema_state: SchemaState::Public,
		backfill: None,
		terminal: true,
	})
}

pub(crate) fn drop_schema(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	if snapshot.schema(job.schema_id).is_none() {
		return Err(ValidationError::UnknownSchema(job.schema_name.clone()).into());
	}
	Ok(Step {
		change: SchemaChange::DropSchema { id: job.schema_id },
		schema_state: SchemaState::Absent,
		backfill: None,
		terminal: true,
	})
}
