// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	fmt,
	fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};

/// Sub-phase of an element (column, index) undergoing an online schema
/// change.
///
/// Additive changes walk `Absent → DeleteOnly → WriteOnly → WriteReorg →
/// Public`; destructive changes walk the ladder in reverse, ending in
/// `DeleteReorg` before the element disappears. Every step is published as
/// its own schema version so that no two live versions are ever more than
/// one step apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaState {
	/// The element does not exist (yet, or anymore).
	Absent,
	/// Visible to delete operations only.
	DeleteOnly,
	/// Visible to all writes, invisible to reads.
	WriteOnly,
	/// Writes visible, backfill of existing rows in progress.
	WriteReorg,
	/// Deletes visible, cleanup of existing rows in progress.
	DeleteReorg,
	/// Fully visible.
	Public,
}

impl SchemaState {
	pub fn is_public(&self) -> bool {
		matches!(self, SchemaState::Public)
	}
}

impl Display for SchemaState {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			SchemaState::Absent => f.write_str("absent"),
			SchemaState::DeleteOnly => f.write_str("delete-only"),
			SchemaState::WriteOnly => f.write_str("write-only"),
			SchemaState::WriteReorg => f.write_str("write-reorg"),
			SchemaState::DeleteReorg => f.write_str("delete-reorg"),
			SchemaState::Public => f.write_str("public"),
		}
	}
}
