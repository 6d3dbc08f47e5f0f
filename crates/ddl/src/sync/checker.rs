// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	thread,
	thread::JoinHandle,
	time::Duration,
};

use parking_lot::Mutex;
use tessera_core::{
	JobId, METRIC_SYNC_PENDING, MetricsRecorder, NodeId, SchemaVersion,
	interface::SessionRegistry,
};
use tracing::{debug, info, warn};

use crate::sync::{DrainTable, VersionReporter};

/// Node-local synchronization state of the drain checker: the newest
/// version this node has seen required, whether any pending job still
/// needs this node to drain, and the report-dedup cache.
///
/// Owned by the checker and accessed through these methods only.
pub struct CheckerState {
	max_seen_version: AtomicU64,
	sync_needed: AtomicBool,
	/// Last successfully reported version per job. Bounded: overflow
	/// clears the whole cache and accepts some redundant re-reports
	/// rather than tracking recency.
	report_cache: Mutex<HashMap<JobId, SchemaVersion>>,
	capacity: usize,
}

impl CheckerState {
	fn new(capacity: usize) -> Self {
		Self {
			max_seen_version: AtomicU64::new(0),
			sync_needed: AtomicBool::new(false),
			report_cache: Mutex::new(HashMap::new()),
			capacity,
		}
	}

	pub fn sync_needed(&self) -> bool {
		self.sync_needed.load(Ordering::SeqCst)
	}

	pub fn max_seen_version(&self) -> SchemaVersion {
		SchemaVersion(self.max_seen_version.load(Ordering::SeqCst))
	}

	fn set_sync_needed(&self, needed: bool) {
		self.sync_needed.store(needed, Ordering::SeqCst);
	}

	/// Record the newest required version; returns true if it advanced.
	fn observe_newest(&self, newest: SchemaVersion) -> bool {
		let previous = self.max_seen_version.fetch_max(newest.0, Ordering::SeqCst);
		newest.0 > previous
	}

	fn already_reported(&self, job: JobId, version: SchemaVersion) -> bool {
		self.report_cache.lock().get(&job).is_some_and(|v| *v >= version)
	}

	fn record_reported(&self, job: JobId, version: SchemaVersion) {
		self.report_cache.lock().insert(job, version);
	}

	/// Clear-on-overflow, checked once per iteration.
	fn clear_if_overflowed(&self) {
		let mut cache = self.report_cache.lock();
		if cache.len() > self.capacity {
			debug!(entries = cache.len(), "report cache overflow, clearing");
			cache.clear();
		}
	}

	#[cfg(test)]
	fn reported(&self, job: JobId) -> Option<SchemaVersion> {
		self.report_cache.lock().get(&job).copied()
	}
}

/// Per-node metadata-lock drain checker.
///
/// On a fixed interval it inspects the drain table and this node's
/// active sessions, and reports — once per resolved transition — that
/// the node no longer depends on versions below a pending job's
/// requirement.
pub struct MdlChecker {
	node: NodeId,
	drain: Arc<DrainTable>,
	sessions: Arc<dyn SessionRegistry>,
	reporter: Arc<dyn VersionReporter>,
	metrics: Arc<dyn MetricsRecorder>,
	state: CheckerState,
	interval: Duration,
}

impl MdlChecker {
	pub fn new(
		node: NodeId,
		drain: Arc<DrainTable>,
		sessions: Arc<dyn SessionRegistry>,
		reporter: Arc<dyn VersionReporter>,
		metrics: Arc<dyn MetricsRecorder>,
		interval: Duration,
		report_cache_capacity: usize,
	) -> Self {
		Self {
			node,
			drain,
			sessions,
			reporter,
			metrics,
			state: CheckerState::new(report_cache_capacity),
			interval,
		}
	}

	pub fn node(&self) -> NodeId {
		self.node
	}

	pub fn state(&self) -> &CheckerState {
		&self.state
	}

	/// Run one check iteration. Any error is logged and swallowed — a
	/// failed iteration must never take the loop down.
	pub fn check(&self) {
		if let Err(error) = self.check_inner() {
			warn!(node = self.node.0, %error, "mdl check iteration failed");
		}
	}

	fn check_inner(&self) -> tessera_core::Result<()> {
		let (newest, jobs) = self.drain.snapshot();

		if self.state.observe_newest(newest) {
			self.metrics.increment(METRIC_SYNC_PENDING);
		}

		// Nothing pending: clear the flag and avoid reporting churn.
		if jobs.is_empty() {
			self.state.set_sync_needed(false);
			return Ok(());
		}
		self.state.set_sync_needed(true);

		let sessions = self.sessions.active_sessions();
		let mut resolved = Vec::new();
		let mut max_resolved = SchemaVersion::ZERO;
		for (job, required) in &jobs {
			// A session pinned below the required version still
			// depends on the old schema; the job is unresolved on
			// this node until it finishes.
			let blocked = sessions.iter().any(|s| s.pinned_version < *required);
			if blocked {
				debug!(
					node = self.node.0,
					job = job.0,
					required = required.0,
					"job blocked by active session"
				);
				continue;
			}
			if *required > max_resolved {
				max_resolved = *required;
			}
			resolved.push((*job, *required));
		}

		self.state.clear_if_overflowed();
		for (job, version) in &resolved {
			if self.state.already_reported(*job, *version) {
				continue;
			}
			match self.reporter.update_self_version(self.node, *job, *version) {
				Ok(accepted) => {
					self.state.record_reported(*job, *version);
					if accepted {
						info!(
							node = self.node.0,
							job = job.0,
							version = version.0,
							"mdl drained, reported to owner"
						);
					}
				}
				Err(error) => {
					// Not recorded in the cache; retried on a
					// later iteration.
					warn!(
						node = self.node.0,
						job = job.0,
						%error,
						"version report failed"
					);
				}
			}
		}

		if resolved.len() == jobs.len() && max_resolved >= newest {
			self.state.set_sync_needed(false);
		}
		Ok(())
	}

	/// Start the background loop. The checker runs regardless of owner
	/// status for the lifetime of the node process.
	pub fn spawn(self) -> MdlCheckerHandle {
		let checker = Arc::new(self);
		let running = Arc::new(AtomicBool::new(true));

		let handle = {
			let checker = Arc::clone(&checker);
			let running = Arc::clone(&running);
			thread::Builder::new()
				.name(format!("mdl-checker-{}", checker.node.0))
				.spawn(move || {
					info!(node = checker.node.0, "mdl checker started");
					while running.load(Ordering::SeqCst) {
						checker.check();
						thread::sleep(checker.interval);
					}
					info!(node = checker.node.0, "mdl checker stopped");
				})
				.expect("failed to spawn mdl checker")
		};

		MdlCheckerHandle {
			checker,
			running,
			handle: Some(handle),
		}
	}
}

/// Owning handle for a running checker thread. Stops the loop
/// cooperatively (at the next poll boundary) and joins on drop.
pub struct MdlCheckerHandle {
	checker: Arc<MdlChecker>,
	running: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl MdlCheckerHandle {
	pub fn checker(&self) -> &MdlChecker {
		&self.checker
	}

	pub fn stop(&mut self) {
		self.running.store(false, Ordering::SeqCst);
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

impl Drop for MdlCheckerHandle {
	fn drop(&mut self) {
		self.stop();
	}
}
