// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::time::Duration;

/// Malformed or semantically invalid DDL. Cancels the job immediately
/// and surfaces synchronously to the submitter; never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
	#[error("schema '{0}' already exists")]
	DuplicateSchema(String),

	#[error("unknown schema '{0}'")]
	UnknownSchema(String),

	#[error("table '{0}' already exists")]
	DuplicateTable(String),

	#[error("unknown table '{0}'")]
	UnknownTable(String),

	#[error("column '{column}' already exists in table '{table}'")]
	DuplicateColumn {
		table: String,
		column: String,
	},

	#[error("unknown column '{column}' in table '{table}'")]
	UnknownColumn {
		table: String,
		column: String,
	},

	#[error("index '{index}' already exists on table '{table}'")]
	DuplicateIndex {
		table: String,
		index: String,
	},

	#[error("unknown index '{index}' on table '{table}'")]
	UnknownIndex {
		table: String,
		index: String,
	},

	#[error("partition '{partition}' already exists on table '{table}'")]
	DuplicatePartition {
		table: String,
		partition: String,
	},

	#[error("unknown partition '{partition}' on table '{table}'")]
	UnknownPartition {
		table: String,
		partition: String,
	},

	#[error("sequence '{0}' already exists")]
	DuplicateSequence(String),

	#[error("unknown sequence '{0}'")]
	UnknownSequence(String),

	#[error("job arguments do not match action: {0}")]
	ArgumentMismatch(String),
}

/// Job-level error taxonomy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DdlError {
	#[error("validation failed: {0}")]
	Validation(#[from] ValidationError),

	#[error("transient storage conflict, retries exhausted: {0}")]
	TransientStorage(String),

	/// Internal signal: one drain-wait deadline elapsed without every
	/// node confirming. Non-fatal — the syncer logs, meters, and keeps
	/// polling.
	#[error("schema sync incomplete after {0:?}")]
	SyncTimeout(Duration),

	/// The owner lease expired mid-job. The next owner resumes from
	/// persisted state.
	#[error("owner lease lost")]
	OwnerLost,

	#[error("job cancelled")]
	Cancelled,

	#[error(transparent)]
	Store(#[from] tessera_core::Error),
}

pub type Result<T> = std::result::Result<T, DdlError>;
