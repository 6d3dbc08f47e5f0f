// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use serde::{Deserialize, Serialize};

use crate::id::{SchemaId, SequenceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
	pub id: SequenceId,
	pub schema: SchemaId,
	pub name: String,
	pub start: i64,
	pub increment: i64,
	pub min_value: i64,
	pub max_value: i64,
	pub cache: u64,
	pub cycle: bool,
}
