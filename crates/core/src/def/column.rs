// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::{def::SchemaState, id::ColumnId};

/// Primitive column types understood by the control plane. Everything
/// beyond naming and equality (coercion, layout) belongs to the execution
/// layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
	Bool,
	Int1,
	Int2,
	Int4,
	Int8,
	Float4,
	Float8,
	Utf8,
	Date,
	DateTime,
	Time,
	Uuid,
	Blob,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
	pub id: ColumnId,
	pub name: String,
	pub ty: Type,
	pub nullable: bool,
	pub default: Option<String>,
	pub index: ColumnIndex,
	pub auto_increment: bool,
	/// Online schema-change sub-phase. `Public` for settled columns.
	pub state: SchemaState,
}

impl ColumnDef {
	/// Whether write operations at the column's current state must
	/// populate it.
	pub fn visible_to_writes(&self) -> bool {
		matches!(
			self.state,
			SchemaState::WriteOnly | SchemaState::WriteReorg | SchemaState::Public
		)
	}

	/// Whether read operations at the column's current state may observe
	/// it.
	pub fn visible_to_reads(&self) -> bool {
		self.state.is_public()
	}
}

/// Ordinal position of a column within its table.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnIndex(pub u16);

impl Deref for ColumnIndex {
	type Target = u16;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl PartialEq<u16> for ColumnIndex {
	fn eq(&self, other: &u16) -> bool {
		self.0.eq(other)
	}
}

impl From<ColumnIndex> for u16 {
	fn from(value: ColumnIndex) -> Self {
		value.0
	}
}
