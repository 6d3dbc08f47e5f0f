// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread,
	thread::JoinHandle,
};

use tessera_core::{
	DdlJob, Error, HistoryEntry, JobState, SchemaVersion, TableId, now_millis, retry,
};
use tracing::{error, info, warn};

use crate::{
	DdlError,
	context::DdlContext,
	handler,
	handler::{Backfill, Step},
	owner::OwnerLease,
	sync::DrainWait,
};

/// The single-owner job execution loop.
///
/// Exactly one executor is active cluster-wide (the lease store
/// arbitrates); the others idle as standbys racing for the lease. The
/// active executor drives jobs strictly in job-id order, one phase at a
/// time, draining the cluster after every committed version.
pub struct JobExecutor {
	ctx: DdlContext,
	lease: Arc<OwnerLease>,
	running: Arc<AtomicBool>,
}

impl JobExecutor {
	/// Start the executor loop on a named background thread.
	pub fn spawn(ctx: DdlContext, lease: OwnerLease) -> ExecutorHandle {
		let lease = Arc::new(lease);
		let running = Arc::new(AtomicBool::new(true));
		let executor = Arc::new(JobExecutor {
			ctx,
			lease: Arc::clone(&lease),
			running: Arc::clone(&running),
		});

		let handle = {
			let executor = Arc::clone(&executor);
			thread::Builder::new()
				.name(format!("ddl-executor-{}", executor.ctx.node.0))
				.spawn(move || executor.run())
				.expect("failed to spawn ddl executor")
		};

		ExecutorHandle {
			lease,
			running,
			handle: Some(handle),
		}
	}

	fn run(&self) {
		info!(node = self.ctx.node.0, "ddl executor started");
		while self.running.load(Ordering::SeqCst) {
			if !self.lease.ensure() {
				thread::sleep(self.ctx.config.lease_retry_interval);
				continue;
			}
			match self.ctx.store.claim_oldest(self.ctx.node) {
				Ok(Some(job)) => self.run_job(job),
				Ok(None) => thread::sleep(self.ctx.config.idle_interval),
				Err(err) => {
					error!(node = self.ctx.node.0, %err, "job claim failed");
					thread::sleep(self.ctx.config.idle_interval);
				}
			}
		}
		self.lease.release();
		info!(node = self.ctx.node.0, "ddl executor stopped");
	}

	fn run_job(&self, mut job: DdlJob) {
		info!(job = job.id.0, action = %job.action, "executing ddl job");
		match self.drive(&mut job) {
			Ok(()) => {
				if let Err(err) = self.ctx.store.archive(job.clone()) {
					error!(job = job.id.0, %err, "job archive failed");
				}
				let outcome = match job.state {
					JobState::Done => Ok(job.clone()),
					_ => Err(DdlError::Cancelled),
				};
				info!(job = job.id.0, state = ?job.state, "ddl job finished");
				self.ctx.completions.notify(job.id, outcome);
			}
			Err(DdlError::OwnerLost) => {
				// The job stays in the queue; the next owner resumes
				// it from its last committed phase.
				warn!(job = job.id.0, "owner lost mid-job, leaving job for next owner");
			}
			// A store conflict while the lease is gone is the same
			// situation: the new owner has taken over the job.
			Err(err) if !self.lease.is_owner() => {
				warn!(job = job.id.0, %err, "lost ownership mid-job, leaving job");
			}
			Err(err) => {
				warn!(job = job.id.0, %err, "ddl job failed");
				job.state = JobState::Cancelled;
				job.error = Some(err.to_string());
				if let Err(persist_err) = self
					.ctx
					.store
					.update(&job)
					.and_then(|_| self.ctx.store.archive(job.clone()))
				{
					error!(job = job.id.0, %persist_err, "failed to persist job failure");
				}
				self.ctx.completions.notify(job.id, Err(err));
			}
		}
	}

	/// Drive `job` until it reaches a terminal state. Every iteration is
	/// one phase: compute the step from persisted state, commit it,
	/// publish the version, drain the cluster.
	fn drive(&self, job: &mut DdlJob) -> crate::Result<()> {
		if job.state == JobState::Queued {
			job.state = JobState::Running;
			self.ctx.store.update(job)?;
		}

		// Resumption after failover: the last committed phase may not
		// have drained under the previous owner. Draining again is a
		// cheap no-op when it already has.
		if job.version > SchemaVersion::ZERO && !job.is_finished() {
			self.wait_drain(job, job.version)?;
		}

		loop {
			self.ctx.catalog.refresh()?;
			let snapshot = self.ctx.catalog.latest_or_empty();

			// Resumed after failover between the final commit and the
			// terminal-state write: nothing left to apply.
			if handler::phase_complete(job) {
				job.state = JobState::Done;
				self.ctx.store.update(job)?;
				return Ok(());
			}

			// Phase boundary: pick up administrative cancellation.
			if let Some(stored) = self.ctx.store.get(job.id)? {
				job.cancel_requested = stored.cancel_requested;
			}
			if job.cancel_requested {
				return self.rollback(job);
			}

			let step = handler::next_step(&snapshot, job)?;
			let terminal = step.terminal;
			self.apply_step(job, step)?;

			// The terminal state is persisted only after the final
			// version has drained.
			if terminal {
				job.state = JobState::Done;
				self.ctx.store.update(job)?;
				return Ok(());
			}
		}
	}

	/// Walk a cancelled job's ladder back to its starting point, each
	/// reverse step a versioned change of its own.
	fn rollback(&self, job: &mut DdlJob) -> crate::Result<()> {
		info!(job = job.id.0, "cancelling ddl job");
		self.ctx.syncer.release(job.id);
		loop {
			self.ctx.catalog.refresh()?;
			let snapshot = self.ctx.catalog.latest_or_empty();
			match handler::rollback_step(&snapshot, job)? {
				None => {
					job.state = if job.version > SchemaVersion::ZERO {
						JobState::RollbackDone
					} else {
						JobState::Cancelled
					};
					job.error = Some(DdlError::Cancelled.to_string());
					self.ctx.store.update(job)?;
					return Ok(());
				}
				Some(step) => {
					let terminal = step.terminal;
					self.apply_step(job, step)?;
					if terminal {
						job.state = JobState::RollbackDone;
						job.error = Some(DdlError::Cancelled.to_string());
						self.ctx.store.update(job)?;
						return Ok(());
					}
				}
			}
		}
	}

	/// Commit one phase: backfill if the step needs it, write the job
	/// and history entry atomically, publish the new snapshot and
	/// version, then block until the cluster has drained.
	fn apply_step(&self, job: &mut DdlJob, step: Step) -> crate::Result<()> {
		let snapshot = self.ctx.catalog.latest_or_empty();

		if let Some(backfill) = &step.backfill {
			self.run_backfill(snapshot.version(), backfill)?;
		}

		// Commit under a confirmed lease; a node that cannot renew must
		// not write.
		if !self.lease.ensure() {
			return Err(DdlError::OwnerLost);
		}

		let version = snapshot.version().next();
		job.version = version;
		job.schema_state = step.schema_state;

		let entry = HistoryEntry {
			version,
			timestamp_ms: now_millis(),
			job: job.id,
			change: step.change,
		};
		retry(&self.ctx.config.retry, || self.ctx.store.commit_phase(job, entry.clone()))
			.map_err(|err| match err {
				Error::Conflict(reason) => DdlError::TransientStorage(reason),
				other => DdlError::Store(other),
			})?;

		// Make the committed version observable: snapshot cache first,
		// then the process-wide register.
		self.ctx.catalog.refresh()?;
		self.ctx.syncer.publish_version(version);
		info!(
			job = job.id.0,
			version = version.0,
			state = %job.schema_state,
			"schema version published"
		);

		self.wait_drain(job, version)
	}

	fn wait_drain(&self, job: &DdlJob, target: SchemaVersion) -> crate::Result<()> {
		self.ctx.syncer.arm(job.id, target);
		let running = &self.running;
		let outcome = self
			.ctx
			.syncer
			.wait_for_drain(job.id, target, &|| !running.load(Ordering::SeqCst));
		self.ctx.syncer.release(job.id);
		match outcome {
			DrainWait::Drained => Ok(()),
			// Shutdown mid-wait: stop acting as owner, leave the job
			// for resumption.
			DrainWait::Interrupted => Err(DdlError::OwnerLost),
		}
	}

	fn run_backfill(&self, version: SchemaVersion, backfill: &Backfill) -> crate::Result<()> {
		match backfill {
			Backfill::IndexFill { table, index } => {
				info!(table = table.0, index = %index, "backfilling index");
				let mut txn = self.ctx.storage.begin(version)?;
				let rows = txn.scan(*table)?;
				let count = rows.len();
				for (row_key, _) in rows {
					let entry_key = index_entry_key(*table, index, &row_key);
					// Re-running after a replayed phase start writes
					// the same entries again; the put is idempotent.
					txn.put(&entry_key, row_key)?;
				}
				txn.commit()?;
				info!(table = table.0, index = %index, rows = count, "index backfill complete");
				Ok(())
			}
		}
	}
}

fn index_entry_key(table: TableId, index: &str, row_key: &[u8]) -> Vec<u8> {
	let mut key = Vec::with_capacity(1 + 8 + index.len() + 1 + row_key.len());
	key.push(b'i');
	key.extend_from_slice(&table.0.to_be_bytes());
	key.extend_from_slice(index.as_bytes());
	key.push(0x00);
	key.extend_from_slice(row_key);
	key
}

/// Owning handle for a running executor. Stops the loop cooperatively
/// and joins on drop; the lease is released on the way out.
pub struct ExecutorHandle {
	lease: Arc<OwnerLease>,
	running: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl ExecutorHandle {
	pub fn is_owner(&self) -> bool {
		self.lease.is_owner()
	}

	pub fn stop(&mut self) {
		self.running.store(false, Ordering::SeqCst);
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

impl Drop for ExecutorHandle {
	fn drop(&mut self) {
		self.stop();
	}
}
