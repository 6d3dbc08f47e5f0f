// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	collections::BTreeMap,
	time::{Duration, Instant},
};

use parking_lot::Mutex;
use tessera_core::{
	DdlJob, Error, HistoryEntry, JobId, NodeId, SchemaVersion,
	interface::{ChangeLog, JobStore, LeaseStore},
};

/// In-memory job store.
///
/// Jobs and history entries round-trip through their serialized form on
/// every access, so the store behaves like a persisted one: anything
/// that would not survive encoding does not survive here either.
pub struct MemoryJobStore {
	inner: Mutex<JobStoreInner>,
}

struct JobStoreInner {
	next_id: u64,
	queue: BTreeMap<JobId, String>,
	archive: BTreeMap<JobId, String>,
	log: Vec<String>,
}

fn encode<T: serde::Serialize>(value: &T) -> tessera_core::Result<String> {
	serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> tessera_core::Result<T> {
	serde_json::from_str(raw).map_err(|e| Error::Serialization(e.to_string()))
}

impl MemoryJobStore {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(JobStoreInner {
				next_id: 0,
				queue: BTreeMap::new(),
				archive: BTreeMap::new(),
				log: Vec::new(),
			}),
		}
	}

	/// Number of jobs still in the queue.
	pub fn queued(&self) -> usize {
		self.inner.lock().queue.len()
	}
}

impl Default for MemoryJobStore {
	fn default() -> Self {
		Self::new()
	}
}

impl JobStoreInner {
	fn stored_job(&self, id: JobId) -> tessera_core::Result<Option<DdlJob>> {
		match self.queue.get(&id).or_else(|| self.archive.get(&id)) {
			Some(raw) => decode(raw).map(Some),
			None => Ok(None),
		}
	}

	/// The claim/update guard: the caller must present the same owner
	/// the store has on record.
	fn check_owner(&self, job: &DdlJob) -> tessera_core::Result<()> {
		let Some(raw) = self.queue.get(&job.id) else {
			return Err(Error::NotFound(format!("job {} not queued", job.id)));
		};
		let stored: DdlJob = decode(raw)?;
		if stored.owner != job.owner {
			return Err(Error::Conflict(format!(
				"job {} claimed by another owner",
				job.id
			)));
		}
		Ok(())
	}

	fn tail_version(&self) -> tessera_core::Result<SchemaVersion> {
		match self.log.last() {
			Some(raw) => {
				let entry: HistoryEntry = decode(raw)?;
				Ok(entry.version)
			}
			None => Ok(SchemaVersion::ZERO),
		}
	}
}

impl JobStore for MemoryJobStore {
	fn next_job_id(&self) -> tessera_core::Result<JobId> {
		let mut inner = self.inner.lock();
		inner.next_id += 1;
		Ok(JobId(inner.next_id))
	}

	fn append(&self, job: DdlJob) -> tessera_core::Result<()> {
		let mut inner = self.inner.lock();
		if inner.queue.contains_key(&job.id) || inner.archive.contains_key(&job.id) {
			return Err(Error::Conflict(format!("job {} already exists", job.id)));
		}
		let raw = encode(&job)?;
		inner.queue.insert(job.id, raw);
		Ok(())
	}

	fn claim_oldest(&self, owner: NodeId) -> tessera_core::Result<Option<DdlJob>> {
		let mut inner = self.inner.lock();
		let mut claimed: Option<DdlJob> = None;
		for raw in inner.queue.values() {
			let job: DdlJob = decode(raw)?;
			if !job.is_finished() {
				claimed = Some(job);
				break;
			}
		}
		// A stale owner field from a lost lease holder is overwritten;
		// the lease store, not this field, arbitrates ownership. The
		// field exists so updates from the loser are rejected.
		let Some(mut job) = claimed else {
			return Ok(None);
		};
		job.owner = Some(owner);
		let raw = encode(&job)?;
		inner.queue.insert(job.id, raw);
		Ok(Some(job))
	}

	fn update(&self, job: &DdlJob) -> tessera_core::Result<()> {
		let mut inner = self.inner.lock();
		inner.check_owner(job)?;
		let raw = encode(job)?;
		inner.queue.insert(job.id, raw);
		Ok(())
	}

	fn commit_phase(&self, job: &DdlJob, entry: HistoryEntry) -> tessera_core::Result<()> {
		let mut inner = self.inner.lock();
		inner.check_owner(job)?;
		// The log accepts exactly the next version; anything else means
		// a concurrent writer or a replayed commit.
		let tail = inner.tail_version()?;
		if entry.version != tail.next() {
			return Err(Error::Conflict(format!(
				"history tail is {tail}, rejecting version {}",
				entry.version
			)));
		}
		let raw_job = encode(job)?;
		let raw_entry = encode(&entry)?;
		inner.queue.insert(job.id, raw_job);
		inner.log.push(raw_entry);
		Ok(())
	}

	fn request_cancel(&self, id: JobId) -> tessera_core::Result<bool> {
		let mut inner = self.inner.lock();
		let Some(raw) = inner.queue.get(&id) else {
			return Ok(false);
		};
		let mut job: DdlJob = decode(raw)?;
		if job.is_finished() {
			return Ok(false);
		}
		job.cancel_requested = true;
		let raw = encode(&job)?;
		inner.queue.insert(id, raw);
		Ok(true)
	}

	fn get(&self, id: JobId) -> tessera_core::Result<Option<DdlJob>> {
		self.inner.lock().stored_job(id)
	}

	fn archive(&self, job: DdlJob) -> tessera_core::Result<()> {
		debug_assert!(job.is_finished());
		let mut inner = self.inner.lock();
		inner.queue.remove(&job.id);
		let raw = encode(&job)?;
		inner.archive.insert(job.id, raw);
		Ok(())
	}
}

impl ChangeLog for MemoryJobStore {
	fn changes_up_to(&self, version: SchemaVersion) -> tessera_core::Result<Vec<HistoryEntry>> {
		let inner = self.inner.lock();
		let mut entries = Vec::new();
		for raw in &inner.log {
			let entry: HistoryEntry = decode(raw)?;
			if entry.version <= version {
				entries.push(entry);
			}
		}
		Ok(entries)
	}

	fn changes_at_or_before(&self, timestamp_ms: u64) -> tessera_core::Result<Vec<HistoryEntry>> {
		let inner = self.inner.lock();
		let mut entries = Vec::new();
		for raw in &inner.log {
			let entry: HistoryEntry = decode(raw)?;
			if entry.timestamp_ms <= timestamp_ms {
				entries.push(entry);
			}
		}
		Ok(entries)
	}

	fn latest_version(&self) -> tessera_core::Result<SchemaVersion> {
		self.inner.lock().tail_version()
	}
}

/// In-memory lease with wall-clock expiry. The single mutex stands in
/// for the external distributed mutual-exclusion primitive.
pub struct MemoryLeaseStore {
	inner: Mutex<Option<Lease>>,
}

struct Lease {
	holder: NodeId,
	expires_at: Instant,
}

impl MemoryLeaseStore {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(None),
		}
	}
}

impl Default for MemoryLeaseStore {
	fn default() -> Self {
		Self::new()
	}
}

impl LeaseStore for MemoryLeaseStore {
	fn try_acquire(&self, node: NodeId, ttl: Duration) -> tessera_core::Result<bool> {
		let mut inner = self.inner.lock();
		match inner.as_ref() {
			Some(lease) if lease.holder != node && lease.expires_at > Instant::now() => {
				Ok(false)
			}
			_ => {
				*inner = Some(Lease {
					holder: node,
					expires_at: Instant::now() + ttl,
				});
				Ok(true)
			}
		}
	}

	fn renew(&self, node: NodeId, ttl: Duration) -> tessera_core::Result<bool> {
		let mut inner = self.inner.lock();
		match inner.as_mut() {
			Some(lease) if lease.holder == node && lease.expires_at > Instant::now() => {
				lease.expires_at = Instant::now() + ttl;
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	fn release(&self, node: NodeId) -> tessera_core::Result<()> {
		let mut inner = self.inner.lock();
		if inner.as_ref().is_some_and(|lease| lease.holder == node) {
			*inner = None;
		}
		Ok(())
	}

	fn holder(&self) -> tessera_core::Result<Option<NodeId>> {
		let inner = self.inner.lock();
		Ok(inner
			.as_ref()
			.filter(|lease| lease.expires_at > Instant::now())
			.map(|lease| lease.holder))
	}
}

#[cfg(test)]
mod tests {
	use tessera_core::{
		ActionKind, JobArgs, JobState, SchemaChange, SchemaId, TableId,
		def::{SchemaDef, SchemaState},
	};

	use super::*;

	fn queued_job(id: u64) -> DdlJob {
		DdlJob {
			id: JobId(id),
			schema_id: SchemaId(1),
			schema_name: "app".into(),
			table_id: TableId(0),
			table_name: String::new(),
			action: ActionKind::CreateSchema,
			args: JobArgs::CreateSchema {
				def: SchemaDef {
					id: SchemaId(1),
					name: "app".into(),
				},
			},
			schema_state: SchemaState::Absent,
			state: JobState::Queued,
			error: None,
			snapshot_version: SchemaVersion::ZERO,
			version: SchemaVersion::ZERO,
			owner: None,
			cancel_requested: false,
		}
	}

	#[test]
	fn test_job_ids_strictly_increase() {
		let store = MemoryJobStore::new();
		let a = store.next_job_id().unwrap();
		let b = store.next_job_id().unwrap();
		assert!(b > a);
	}

	#[test]
	fn test_claim_oldest_is_fifo() {
		let store = MemoryJobStore::new();
		store.append(queued_job(2)).unwrap();
		store.append(queued_job(1)).unwrap();

		let claimed = store.claim_oldest(NodeId(7)).unwrap().unwrap();
		assert_eq!(claimed.id, JobId(1));
		assert_eq!(claimed.owner, Some(NodeId(7)));
	}

	#[test]
	fn test_update_rejects_stale_owner() {
		let store = MemoryJobStore::new();
		store.append(queued_job(1)).unwrap();

		let mut job = store.claim_oldest(NodeId(1)).unwrap().unwrap();
		// A new owner claims after the first one lost its lease
		store.claim_oldest(NodeId(2)).unwrap().unwrap();

		job.state = JobState::Running;
		assert!(matches!(store.update(&job), Err(Error::Conflict(_))));
	}

	#[test]
	fn test_commit_phase_rejects_version_gap() {
		let store = MemoryJobStore::new();
		store.append(queued_job(1)).unwrap();
		let job = store.claim_oldest(NodeId(1)).unwrap().unwrap();

		let entry = |version: u64| HistoryEntry {
			version: SchemaVersion(version),
			timestamp_ms: 1,
			job: job.id,
			change: SchemaChange::CreateSchema {
				def: SchemaDef {
					id: SchemaId(1),
					name: "app".into(),
				},
			},
		};

		assert!(matches!(store.commit_phase(&job, entry(2)), Err(Error::Conflict(_))));
		store.commit_phase(&job, entry(1)).unwrap();
		// Replaying the same version is rejected, not double-applied
		assert!(matches!(store.commit_phase(&job, entry(1)), Err(Error::Conflict(_))));
		assert_eq!(store.latest_version().unwrap(), SchemaVersion(1));
	}

	#[test]
	fn test_cancel_request_only_for_unfinished() {
		let store = MemoryJobStore::new();
		store.append(queued_job(1)).unwrap();
		assert!(store.request_cancel(JobId(1)).unwrap());
		assert!(store.get(JobId(1)).unwrap().unwrap().cancel_requested);

		let mut job = store.claim_oldest(NodeId(1)).unwrap().unwrap();
		job.state = JobState::Cancelled;
		store.update(&job).unwrap();
		store.archive(job).unwrap();
		assert!(!store.request_cancel(JobId(1)).unwrap());
	}

	#[test]
	fn test_archive_moves_job_out_of_queue() {
		let store = MemoryJobStore::new();
		store.append(queued_job(1)).unwrap();
		let mut job = store.claim_oldest(NodeId(1)).unwrap().unwrap();
		job.state = JobState::Done;
		store.update(&job).unwrap();
		store.archive(job.clone()).unwrap();

		assert_eq!(store.queued(), 0);
		assert_eq!(store.get(JobId(1)).unwrap().unwrap().state, JobState::Done);
		assert!(store.claim_oldest(NodeId(1)).unwrap().is_none());
	}
}
