// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

/// Counter names emitted by the control plane.
pub const METRIC_SYNC_PENDING: &str = "ddl_sync_pending";
pub const METRIC_SYNC_NOT_COMPLETED: &str = "ddl_sync_not_completed";

/// Sink for named counter increments. No schema beyond name + count.
pub trait MetricsRecorder: Send + Sync {
	fn increment(&self, name: &'static str);
}

/// In-process recorder backed by atomic counters; the default sink, and
/// inspectable from tests.
#[derive(Clone, Default)]
pub struct Metrics {
	counters: Arc<DashMap<&'static str, AtomicU64>>,
}

impl Metrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn count(&self, name: &'static str) -> u64 {
		self.counters.get(name).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
	}
}

impl MetricsRecorder for Metrics {
	fn increment(&self, name: &'static str) {
		self.counters
			.entry(name)
			.or_insert_with(|| AtomicU64::new(0))
			.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_increment_and_count() {
		let metrics = Metrics::new();
		assert_eq!(metrics.count(METRIC_SYNC_NOT_COMPLETED), 0);

		metrics.increment(METRIC_SYNC_NOT_COMPLETED);
		metrics.increment(METRIC_SYNC_NOT_COMPLETED);
		assert_eq!(metrics.count(METRIC_SYNC_NOT_COMPLETED), 2);

		// Other counters unaffected
		assert_eq!(metrics.count(METRIC_SYNC_PENDING), 0);
	}

	#[test]
	fn test_clone_shares_counters() {
		let metrics = Metrics::new();
		let clone = metrics.clone();
		clone.increment(METRIC_SYNC_PENDING);
		assert_eq!(metrics.count(METRIC_SYNC_PENDING), 1);
	}
}
