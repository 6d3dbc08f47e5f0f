// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

/// Failures surfaced by the collaborator interfaces (job store, lease
/// store, row storage).
///
/// `Conflict` is the only variant the retry helper considers transient;
/// everything else propagates immediately.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("storage failure: {0}")]
	Storage(String),

	#[error("write conflict: {0}")]
	Conflict(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("owner lease lost")]
	LeaseLost,

	#[error("serialization failure: {0}")]
	Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
