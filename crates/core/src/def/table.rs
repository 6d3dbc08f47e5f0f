// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use serde::{Deserialize, Serialize};

use crate::{
	def::{ColumnDef, IndexDef, PartitionDef},
	id::{SchemaId, TableId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
	pub id: TableId,
	pub schema: SchemaId,
	pub name: String,
	pub columns: Vec<ColumnDef>,
	pub indexes: Vec<IndexDef>,
	pub partitions: Vec<PartitionDef>,
	/// Next value handed out by the auto-increment allocator.
	pub auto_increment: u64,
	pub comment: Option<String>,
}

impl TableDef {
	pub fn column(&self, name: &str) -> Option<&ColumnDef> {
		self.columns.iter().find(|c| c.name == name)
	}

	pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnDef> {
		self.columns.iter_mut().find(|c| c.name == name)
	}

	pub fn index(&self, name: &str) -> Option<&IndexDef> {
		self.indexes.iter().find(|i| i.name == name)
	}

	pub fn index_mut(&mut self, name: &str) -> Option<&mut IndexDef> {
		self.indexes.iter_mut().find(|i| i.name == name)
	}

	pub fn partition(&self, name: &str) -> Option<&PartitionDef> {
		self.partitions.iter().find(|p| p.name == name)
	}
}
