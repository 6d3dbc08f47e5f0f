// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionDef {
	pub name: String,
	/// Exclusive upper bound of the partition's key range, encoded by the
	/// storage collaborator. `None` means unbounded (the last range).
	pub upper_bound: Option<Vec<u8>>,
}
