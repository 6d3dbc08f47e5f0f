// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	thread::sleep,
	time::{Duration, Instant},
};

use dashmap::DashMap;
use parking_lot::RwLock;
use tessera_core::{
	JobId, METRIC_SYNC_NOT_COMPLETED, MetricsRecorder, NodeId, SchemaVersion,
	interface::ClusterView,
};
use tracing::{debug, info, warn};

use crate::{DdlError, sync::DrainTable};

/// The version-update call a drain checker uses to confirm that its node
/// no longer depends on versions below `version` for `job`. In-process
/// here; an RPC stub in a real deployment.
pub trait VersionReporter: Send + Sync {
	/// Returns true if the report changed recorded state; false for a
	/// duplicate (no-op).
	fn update_self_version(
		&self,
		node: NodeId,
		job: JobId,
		version: SchemaVersion,
	) -> tessera_core::Result<bool>;
}

/// Outcome of a drain wait. There is no timeout outcome: a wait either
/// completes or is interrupted by cancellation/shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainWait {
	Drained,
	Interrupted,
}

/// Makes a newly committed schema version globally observable before the
/// job that produced it is allowed to proceed.
pub struct VersionSyncer {
	drain: Arc<DrainTable>,
	cluster: Arc<dyn ClusterView>,
	metrics: Arc<dyn MetricsRecorder>,
	/// Per pending job: the last version each node has confirmed.
	confirmations: RwLock<HashMap<JobId, HashMap<NodeId, SchemaVersion>>>,
	/// Newest version each node has ever confirmed, regardless of job.
	node_versions: DashMap<NodeId, SchemaVersion>,
	/// Process-wide register of the newest committed version.
	global_version: AtomicU64,
	poll_interval: Duration,
	drain_timeout: Duration,
}

impl VersionSyncer {
	pub fn new(
		drain: Arc<DrainTable>,
		cluster: Arc<dyn ClusterView>,
		metrics: Arc<dyn MetricsRecorder>,
		poll_interval: Duration,
		drain_timeout: Duration,
	) -> Self {
		Self {
			drain,
			cluster,
			metrics,
			confirmations: RwLock::new(HashMap::new()),
			node_versions: DashMap::new(),
			global_version: AtomicU64::new(0),
			poll_interval,
			drain_timeout,
		}
	}

	pub fn drain_table(&self) -> &Arc<DrainTable> {
		&self.drain
	}

	/// Record the newest committed version in the process-wide
	/// register.
	pub fn publish_version(&self, version: SchemaVersion) {
		self.global_version.fetch_max(version.0, Ordering::SeqCst);
	}

	pub fn global_version(&self) -> SchemaVersion {
		SchemaVersion(self.global_version.load(Ordering::SeqCst))
	}

	/// Arm a pending-drain entry: `job` may not proceed until every
	/// live node confirms `target`.
	pub fn arm(&self, job: JobId, target: SchemaVersion) {
		self.confirmations.write().entry(job).or_default();
		self.drain.arm(job, target);
		debug!(job = job.0, target = target.0, "armed drain entry");
	}

	/// Release `job`'s drain entry (completion or cancellation).
	pub fn release(&self, job: JobId) {
		self.drain.release(job);
		self.confirmations.write().remove(&job);
	}

	/// The newest version `node` has confirmed across all jobs.
	pub fn node_version(&self, node: NodeId) -> Option<SchemaVersion> {
		self.node_versions.get(&node).map(|v| *v)
	}

	/// Whether every currently-live node has confirmed `target` for
	/// `job`.
	pub fn drained(&self, job: JobId, target: SchemaVersion) -> bool {
		let confirmations = self.confirmations.read();
		let Some(per_node) = confirmations.get(&job) else {
			// Entry already released; nothing left to wait for.
			return true;
		};
		self.cluster
			.live_nodes()
			.iter()
			.all(|node| per_node.get(node).is_some_and(|v| *v >= target))
	}

	/// Block until `job`'s drain entry is satisfied or `interrupted`
	/// reports true.
	///
	/// Exceeding the configured deadline never proceeds without acks:
	/// each crossing logs with the total elapsed time (distinguishing
	/// slow from stuck) and increments the sync-not-completed counter,
	/// then polling continues.
	pub fn wait_for_drain(
		&self,
		job: JobId,
		target: SchemaVersion,
		interrupted: &dyn Fn() -> bool,
	) -> DrainWait {
		let started = Instant::now();
		loop {
			let deadline = Instant::now() + self.drain_timeout;
			match self.poll_until(job, target, deadline, interrupted) {
				Ok(outcome) => {
					debug!(
						job = job.0,
						target = target.0,
						elapsed_ms = started.elapsed().as_millis() as u64,
						"drain wait finished"
					);
					return outcome;
				}
				Err(_) => {
					warn!(
						job = job.0,
						target = target.0,
						elapsed_ms = started.elapsed().as_millis() as u64,
						"schema sync not completed within deadline, still waiting"
					);
					self.metrics.increment(METRIC_SYNC_NOT_COMPLETED);
				}
			}
		}
	}

	fn poll_until(
		&self,
		job: JobId,
		target: SchemaVersion,
		deadline: Instant,
		interrupted: &dyn Fn() -> bool,
	) -> Result<DrainWait, DdlError> {
		loop {
			if interrupted() {
				info!(job = job.0, "drain wait interrupted");
				return Ok(DrainWait::Interrupted);
			}
			if self.drained(job, target) {
				return Ok(DrainWait::Drained);
			}
			if Instant::now() >= deadline {
				return Err(DdlError::SyncTimeout(self.drain_timeout));
			}
			sleep(self.poll_interval);
		}
	}
}

impl VersionReporter for VersionSyncer {
	fn update_self_version(
		&self,
		node: NodeId,
		job: JobId,
		version: SchemaVersion,
	) -> tessera_core::Result<bool> {
		self.node_versions
			.entry(node)
			.and_modify(|v| {
				if version > *v {
					*v = version;
				}
			})
			.or_insert(version);

		let mut confirmations = self.confirmations.write();
		let Some(per_node) = confirmations.get_mut(&job) else {
			// Job finished or was cancelled in the meantime.
			return Ok(false);
		};
		match per_node.get(&node) {
			Some(confirmed) if *confirmed >= version => Ok(false),
			_ => {
				per_node.insert(node, version);
				debug!(
					node = node.0,
					job = job.0,
					version = version.0,
					"node confirmed drain version"
				);
				Ok(true)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use tessera_core::Metrics;
	use tessera_testing::cluster::StaticClusterView;

	use super::*;

	fn syncer_with_nodes(nodes: &[u64]) -> VersionSyncer {
		let cluster = Arc::new(StaticClusterView::new(
			nodes.iter().map(|n| NodeId(*n)).collect::<Vec<_>>(),
		));
		VersionSyncer::new(
			Arc::new(DrainTable::new()),
			cluster,
			Arc::new(Metrics::new()),
			Duration::from_millis(1),
			Duration::from_millis(20),
		)
	}

	#[test]
	fn test_drained_requires_all_live_nodes() {
		let syncer = syncer_with_nodes(&[1, 2]);
		syncer.arm(JobId(1), SchemaVersion(7));

		assert!(!syncer.drained(JobId(1), SchemaVersion(7)));

		syncer.update_self_version(NodeId(1), JobId(1), SchemaVersion(7)).unwrap();
		assert!(!syncer.drained(JobId(1), SchemaVersion(7)));

		syncer.update_self_version(NodeId(2), JobId(1), SchemaVersion(7)).unwrap();
		assert!(syncer.drained(JobId(1), SchemaVersion(7)));
	}

	#[test]
	fn test_duplicate_reports_are_noops() {
		let syncer = syncer_with_nodes(&[1]);
		syncer.arm(JobId(1), SchemaVersion(7));

		// Exactly one accepted transition, then no-ops
		assert!(syncer.update_self_version(NodeId(1), JobId(1), SchemaVersion(7)).unwrap());
		assert!(!syncer.update_self_version(NodeId(1), JobId(1), SchemaVersion(7)).unwrap());
		assert!(!syncer.update_self_version(NodeId(1), JobId(1), SchemaVersion(7)).unwrap());
	}

	#[test]
	fn test_report_for_released_job_is_noop() {
		let syncer = syncer_with_nodes(&[1]);
		syncer.arm(JobId(1), SchemaVersion(7));
		syncer.release(JobId(1));

		assert!(!syncer.update_self_version(NodeId(1), JobId(1), SchemaVersion(7)).unwrap());
		// Released entries are vacuously drained
		assert!(syncer.drained(JobId(1), SchemaVersion(7)));
	}

	#[test]
	fn test_wait_for_drain_meters_timeouts_without_proceeding() {
		let metrics = Arc::new(Metrics::new());
		let cluster = Arc::new(StaticClusterView::new(vec![NodeId(1)]));
		let syncer = Arc::new(VersionSyncer::new(
			Arc::new(DrainTable::new()),
			cluster,
			metrics.clone(),
			Duration::from_millis(1),
			Duration::from_millis(10),
		));
		syncer.arm(JobId(1), SchemaVersion(3));

		let waiter = {
			let syncer = syncer.clone();
			std::thread::spawn(move || {
				syncer.wait_for_drain(JobId(1), SchemaVersion(3), &|| false)
			})
		};

		// Let at least one deadline elapse, then confirm
		sleep(Duration::from_millis(30));
		syncer.update_self_version(NodeId(1), JobId(1), SchemaVersion(3)).unwrap();

		assert_eq!(waiter.join().unwrap(), DrainWait::Drained);
		// Timeout crossings were metered and not reset by completion
		assert!(metrics.count(METRIC_SYNC_NOT_COMPLETED) >= 1);
	}

	#[test]
	fn test_publish_version_is_monotonic() {
		let syncer = syncer_with_nodes(&[]);
		syncer.publish_version(SchemaVersion(5));
		syncer.publish_version(SchemaVersion(3));
		assert_eq!(syncer.global_version(), SchemaVersion(5));
	}
}
