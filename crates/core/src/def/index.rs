// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use serde::{Deserialize, Serialize};

use crate::{def::SchemaState, id::IndexId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
	pub id: IndexId,
	pub name: String,
	/// Names of the indexed columns, in key order.
	pub columns: Vec<String>,
	pub unique: bool,
	/// Invisible indexes are maintained but ignored by the planner.
	pub visible: bool,
	/// Online schema-change sub-phase. `Public` for settled indexes.
	pub state: SchemaState,
}
