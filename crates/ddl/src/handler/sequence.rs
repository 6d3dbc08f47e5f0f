// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use tessera_catalog::InfoSchema;
use tessera_core::{DdlJob, JobArgs, SchemaChange, def::SchemaState};

use crate::{
	Result, ValidationError,
	handler::{Step, args_mismatch},
};

pub(crate) fn create_sequence(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::CreateSequence { def } = &job.args else {
		return Err(args_mismatch(job));
	};
	if snapshot.schema(job.schema_id).is_none() {
		return Err(ValidationError::UnknownSchema(job.schema_name.clone()).into());
	}
	if snapshot.sequence_by_name(job.schema_id, &def.name).is_some() {
		return Err(ValidationError::DuplicateSequence(def.name.clone()).into());
	}
	Ok(Step {
		change: SchemaChange::CreateSequence { def: def.clone() },
		schema_state: SchemaState::Public,
		backfill: None,
		terminal: true,
	})
}

pub(crate) fn drop_sequence(snapshot: &InfoSchema, job: &DdlJob) -> Result<Step> {
	let JobArgs::DropSequence { sequence } = &job.args else {
		return Err(args_mismatch(job));
	};
	let Some(def) = snapshot.sequence_by_name(job.schema_id, sequence) else {
		return Err(ValidationError::UnknownSequence(sequence.clone()).into());
	};
	Ok(Step {
		change: SchemaChange::DropSequence { id: def.id },
		schema_state: SchemaState::Absent,
		backfill: None,
		terminal: true,
	})
}
