// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::time::Duration;

use crate::{
	change::HistoryEntry,
	error::Result,
	id::{JobId, NodeId},
	job::DdlJob,
	version::SchemaVersion,
};

/// Persisted, ordered queue of schema-change jobs and their terminal
/// history.
///
/// Implementations must provide strict ordering by job id and atomic
/// claim semantics: `claim_oldest` compare-and-swaps the owner field so
/// that two nodes can never both hold the same running job.
pub trait JobStore: Send + Sync {
	/// Allocate the next job id. Strictly increasing, never reused.
	fn next_job_id(&self) -> Result<JobId>;

	/// Append a freshly submitted job to the queue.
	fn append(&self, job: DdlJob) -> Result<()>;

	/// Claim the oldest unfinished job for `owner`. Returns the job with
	/// its owner field set, or `None` if the queue is empty. A job
	/// already claimed by another live owner is not eligible; a job
	/// claimed by `owner` itself is returned again (resumption).
	fn claim_oldest(&self, owner: NodeId) -> Result<Option<DdlJob>>;

	/// Write back the job's current phase/state. Fails with `Conflict`
	/// if the caller no longer owns the job.
	fn update(&self, job: &DdlJob) -> Result<()>;

	/// Atomically write back the job state and append the history entry
	/// produced by one committed phase. This is the only way a new
	/// schema version becomes durable.
	fn commit_phase(&self, job: &DdlJob, entry: HistoryEntry) -> Result<()>;

	/// Request administrative cancellation. Returns false if the job is
	/// already terminal. The executor honors the request at the next
	/// phase boundary.
	fn request_cancel(&self, job: JobId) -> Result<bool>;

	fn get(&self, job: JobId) -> Result<Option<DdlJob>>;

	/// Move a terminal job out of the queue into the permanent history.
	fn archive(&self, job: DdlJob) -> Result<()>;
}

/// Read access to the permanent, ordered log of applied changes. Backs
/// the snapshot cache's out-of-core rebuild path.
pub trait ChangeLog: Send + Sync {
	/// All entries with version ≤ `version`, ordered by version.
	fn changes_up_to(&self, version: SchemaVersion) -> Result<Vec<HistoryEntry>>;

	/// All entries committed at or before `timestamp_ms`, ordered by
	/// version.
	fn changes_at_or_before(&self, timestamp_ms: u64) -> Result<Vec<HistoryEntry>>;

	/// Version of the newest entry, `ZERO` for an empty log.
	fn latest_version(&self) -> Result<SchemaVersion>;
}

/// Distributed mutual exclusion backing owner election. The store, not
/// in-process locking, is what guarantees a single owner cluster-wide.
pub trait LeaseStore: Send + Sync {
	/// Attempt to take the lease for `ttl`. Succeeds if the lease is
	/// free or expired.
	fn try_acquire(&self, node: NodeId, ttl: Duration) -> Result<bool>;

	/// Extend a held lease. Returns false if `node` no longer holds it —
	/// the caller must stop acting as owner immediately, even if it
	/// believes time remains.
	fn renew(&self, node: NodeId, ttl: Duration) -> Result<bool>;

	/// Give the lease up voluntarily.
	fn release(&self, node: NodeId) -> Result<()>;

	fn holder(&self) -> Result<Option<NodeId>>;
}
