// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	fmt,
	fmt::{Display, Formatter},
	ops::Deref,
};

use serde::{Deserialize, Serialize};

macro_rules! define_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[repr(transparent)]
		#[derive(
			Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize,
		)]
		pub struct $name(pub u64);

		impl Deref for $name {
			type Target = u64;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl PartialEq<u64> for $name {
			fn eq(&self, other: &u64) -> bool {
				self.0.eq(other)
			}
		}

		impl From<$name> for u64 {
			fn from(value: $name) -> Self {
				value.0
			}
		}

		impl From<u64> for $name {
			fn from(value: u64) -> Self {
				Self(value)
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
				Display::fmt(&self.0, f)
			}
		}
	};
}

define_id! {
	/// Identifier of a queued schema-change job, assigned at submission.
	/// Strictly increasing across the cluster.
	JobId
}

define_id! {
	/// Identifier of a schema (database namespace).
	SchemaId
}

define_id! {
	/// Identifier of a table.
	TableId
}

define_id! {
	/// Identifier of a column within a table.
	ColumnId
}

define_id! {
	/// Identifier of a secondary index.
	IndexId
}

define_id! {
	/// Identifier of a sequence.
	SequenceId
}

define_id! {
	/// Identifier of a live query node.
	NodeId
}

define_id! {
	/// Identifier of a client session.
	SessionId
}
