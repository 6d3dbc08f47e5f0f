// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::HashMap;

use parking_lot::RwLock;
use tessera_core::{JobId, SchemaVersion};

/// The cluster-visible table of pending drain requirements: for every
/// job awaiting a version transition, the minimum version each node must
/// reach before the job may proceed.
///
/// Writers (arming on phase commit, releasing on completion or
/// cancellation) take the exclusive lock; the per-node checkers read a
/// consistent snapshot under the shared lock every tick.
pub struct DrainTable {
	inner: RwLock<DrainTableInner>,
}

struct DrainTableInner {
	jobs: HashMap<JobId, SchemaVersion>,
	/// Highest version any entry has ever required. Monotonic; release
	/// does not lower it.
	newest_required: SchemaVersion,
}

impl DrainTable {
	pub fn new() -> Self {
		Self {
			inner: RwLock::new(DrainTableInner {
				jobs: HashMap::new(),
				newest_required: SchemaVersion::ZERO,
			}),
		}
	}

	/// Arm (or raise) the drain requirement for `job`.
	pub fn arm(&self, job: JobId, required: SchemaVersion) {
		let mut inner = self.inner.write();
		inner.jobs.insert(job, required);
		if required > inner.newest_required {
			inner.newest_required = required;
		}
	}

	/// Drop the entry for `job`, if any. Called on job completion and
	/// on cancellation.
	pub fn release(&self, job: JobId) {
		self.inner.write().jobs.remove(&job);
	}

	/// Consistent snapshot for one checker iteration: the newest
	/// version ever required and all pending (job, required version)
	/// pairs.
	pub fn snapshot(&self) -> (SchemaVersion, Vec<(JobId, SchemaVersion)>) {
		let inner = self.inner.read();
		let mut jobs: Vec<_> = inner.jobs.iter().map(|(j, v)| (*j, *v)).collect();
		jobs.sort_by_key(|(j, _)| *j);
		(inner.newest_required, jobs)
	}

	pub fn pending(&self) -> usize {
		self.inner.read().jobs.len()
	}
}

impl Default for DrainTable {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_arm_and_release() {
		let table = DrainTable::new();
		assert_eq!(table.pending(), 0);

		table.arm(JobId(1), SchemaVersion(7));
		table.arm(JobId(2), SchemaVersion(5));
		assert_eq!(table.pending(), 2);

		let (newest, jobs) = table.snapshot();
		assert_eq!(newest, SchemaVersion(7));
		assert_eq!(jobs, vec![(JobId(1), SchemaVersion(7)), (JobId(2), SchemaVersion(5))]);

		table.release(JobId(1));
		assert_eq!(table.pending(), 1);
		// newest_required is monotonic
		assert_eq!(table.snapshot().0, SchemaVersion(7));
	}
}
