// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	fmt,
	fmt::{Display, Formatter},
	num::ParseIntError,
	str::FromStr,
};

use serde::{Deserialize, Serialize};

/// A monotonically increasing integer identifying one immutable schema
/// snapshot. Version `v + 1` is produced only by applying exactly one
/// committed schema change to version `v`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion(pub u64);

impl SchemaVersion {
	/// The version of the empty catalog, before any change was applied.
	pub const ZERO: SchemaVersion = SchemaVersion(0);

	pub fn next(self) -> SchemaVersion {
		SchemaVersion(self.0 + 1)
	}
}

impl FromStr for SchemaVersion {
	type Err = ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(SchemaVersion(u64::from_str(s)?))
	}
}

impl Display for SchemaVersion {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl PartialEq<u64> for SchemaVersion {
	fn eq(&self, other: &u64) -> bool {
		self.0.eq(other)
	}
}

impl From<SchemaVersion> for u64 {
	fn from(value: SchemaVersion) -> Self {
		value.0
	}
}

impl From<u64> for SchemaVersion {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_next_increments() {
		assert_eq!(SchemaVersion::ZERO.next(), 1u64);
		assert_eq!(SchemaVersion(41).next(), SchemaVersion(42));
	}

	#[test]
	fn test_parse() {
		assert_eq!("17".parse::<SchemaVersion>().unwrap(), SchemaVersion(17));
		assert!("not-a-version".parse::<SchemaVersion>().is_err());
	}
}
