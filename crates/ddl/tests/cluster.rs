// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! End-to-end control-plane tests against the in-process cluster
//! harness: one executor, several simulated nodes with drain checkers
//! and pinnable sessions.

use std::{
	thread::sleep,
	time::{Duration, Instant},
};

use tessera_core::{
	JobState, METRIC_SYNC_NOT_COMPLETED, NodeId, SchemaChange, SchemaId, SchemaVersion,
	TableId,
	def::{SchemaState, Type},
	interface::ChangeLog,
};
use tessera_ddl::{DdlError, DdlService, ValidationError};
use tessera_testing::{
	fixtures::{test_column, test_index, test_schema, test_sequence, test_table},
	harness::TestCluster,
};

const APP: SchemaId = SchemaId(1);
const T1: TableId = TableId(1);

fn setup(cluster: &TestCluster) -> DdlService {
	let service = cluster.service();
	service.create_schema(test_schema(1, "app")).unwrap().wait().unwrap();
	service.create_table(APP, "app", test_table(1, 1, "t1")).unwrap().wait().unwrap();
	service
}

fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
	let deadline = Instant::now() + timeout;
	while Instant::now() < deadline {
		if f() {
			return true;
		}
		sleep(Duration::from_millis(2));
	}
	false
}

#[test]
fn test_rename_publishes_new_version_and_keeps_history() {
	let cluster = TestCluster::start(3);
	let service = setup(&cluster);
	let before = cluster.catalog.latest_version();

	service.rename_table(APP, "app", T1, "t1", "t2").unwrap().wait().unwrap();

	// Exactly one version ahead
	assert_eq!(cluster.catalog.latest_version(), before.next());

	let latest = cluster.catalog.latest().unwrap();
	assert!(latest.table_by_name(APP, "t1").is_none());
	assert_eq!(latest.table_by_name(APP, "t2").unwrap().id, T1);

	// The pre-rename snapshot still shows the old name
	let old = cluster.catalog.at_version(before).unwrap();
	assert_eq!(old.table_by_name(APP, "t1").unwrap().id, T1);
	assert!(old.table_by_name(APP, "t2").is_none());
}

#[test]
fn test_versions_are_strictly_increasing_and_gap_free() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);

	service.rename_table(APP, "app", T1, "t1", "t2").unwrap().wait().unwrap();
	service.alter_table_comment(APP, "app", T1, "t2", Some("orders".into()))
		.unwrap()
		.wait()
		.unwrap();
	service.rebase_auto_increment(APP, "app", T1, "t2", 1000).unwrap().wait().unwrap();

	let entries = cluster.job_store.changes_up_to(SchemaVersion(u64::MAX)).unwrap();
	assert!(!entries.is_empty());
	for (offset, entry) in entries.iter().enumerate() {
		assert_eq!(entry.version, SchemaVersion(offset as u64 + 1));
	}
}

#[test]
fn test_add_column_walks_the_state_ladder() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);

	service.add_column(APP, "app", T1, "t1", test_column(3, "age", 2, Type::Int4))
		.unwrap()
		.wait()
		.unwrap();

	let table = cluster.catalog.latest().unwrap().table(T1).unwrap().clone();
	let column = table.column("age").unwrap();
	assert_eq!(column.state, SchemaState::Public);

	// One committed version per ladder step, in order
	let entries = cluster.job_store.changes_up_to(SchemaVersion(u64::MAX)).unwrap();
	let states: Vec<SchemaState> = entries
		.iter()
		.filter_map(|entry| match &entry.change {
			SchemaChange::SetTable { def } => def.column("age").map(|c| c.state),
			_ => None,
		})
		.collect();
	assert_eq!(
		states,
		vec![
			SchemaState::DeleteOnly,
			SchemaState::WriteOnly,
			SchemaState::WriteReorg,
			SchemaState::Public,
		]
	);
}

#[test]
fn test_add_index_backfills_existing_rows() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);

	cluster.storage.seed_row(T1, b"row-1", b"alice");
	cluster.storage.seed_row(T1, b"row-2", b"bob");
	cluster.storage.seed_row(T1, b"row-3", b"carol");

	service.add_index(APP, "app", T1, "t1", test_index(1, "by_name", &["name"]))
		.unwrap()
		.wait()
		.unwrap();

	let table = cluster.catalog.latest().unwrap().table(T1).unwrap().clone();
	assert_eq!(table.index("by_name").unwrap().state, SchemaState::Public);

	// One index entry per existing row
	let mut prefix = vec![b'i'];
	prefix.extend_from_slice(&T1.0.to_be_bytes());
	assert_eq!(cluster.storage.keys_with_prefix(&prefix).len(), 3);
}

#[test]
fn test_validation_error_cancels_synchronously() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);
	let before = cluster.catalog.latest_version();

	let result = service
		.create_table(APP, "app", test_table(2, 1, "t1"))
		.unwrap()
		.wait();
	assert_eq!(
		result.unwrap_err(),
		DdlError::Validation(ValidationError::DuplicateTable("t1".into()))
	);

	// No version was published and the job is archived as cancelled
	assert_eq!(cluster.catalog.latest_version(), before);

	let unknown = service
		.drop_column(APP, "app", T1, "t1", "missing")
		.unwrap()
		.wait()
		.unwrap_err();
	assert!(matches!(
		unknown,
		DdlError::Validation(ValidationError::UnknownColumn { .. })
	));
}

#[test]
fn test_pinned_session_blocks_finalization_until_drain() {
	let cluster = TestCluster::start(3);
	let service = setup(&cluster);

	// A transaction on node 2 pinned at the current version
	cluster.pin_session(NodeId(2), 7);

	let handle = service.rename_table(APP, "app", T1, "t1", "t2").unwrap();
	let job_id = handle.id();

	// Longer than the drain timeout: the job must still be pending,
	// with the timeout metered, not completed without the ack
	assert!(handle.wait_timeout(Duration::from_millis(400)).is_none());
	let job = service.job(job_id).unwrap().unwrap();
	assert!(!job.state.is_terminal());
	let timeouts = cluster.metrics.count(METRIC_SYNC_NOT_COMPLETED);
	assert!(timeouts >= 1);

	// The transaction ends; the node drains and the job completes
	cluster.release_session(NodeId(2), 7);
	let job = handle.wait().unwrap();
	assert_eq!(job.state, JobState::Done);

	// The metric recorded during the stall is not reset
	assert!(cluster.metrics.count(METRIC_SYNC_NOT_COMPLETED) >= timeouts);
}

#[test]
fn test_unreachable_node_blocks_completion_until_recovery() {
	let mut cluster = TestCluster::start(3);
	let service = setup(&cluster);

	// Node 3 stops reporting but stays in the live set
	cluster.stop_checker(NodeId(3));

	let handle = service.rename_table(APP, "app", T1, "t1", "t2").unwrap();
	assert!(handle.wait_timeout(Duration::from_millis(400)).is_none());
	let timeouts = cluster.metrics.count(METRIC_SYNC_NOT_COMPLETED);
	assert!(timeouts >= 1);

	// The node recovers, reports, and the job completes
	cluster.start_checker(NodeId(3));
	let job = handle.wait().unwrap();
	assert_eq!(job.state, JobState::Done);
	assert!(cluster.metrics.count(METRIC_SYNC_NOT_COMPLETED) >= timeouts);
}

#[test]
fn test_owner_failover_resumes_without_double_application() {
	let mut cluster = TestCluster::start(2);
	let service = setup(&cluster);
	let base = cluster.catalog.latest_version();

	// Block the first ladder step's drain so the owner dies mid-job
	cluster.pin_session(NodeId(2), 9);
	let handle = service
		.add_column(APP, "app", T1, "t1", test_column(3, "age", 2, Type::Int4))
		.unwrap();

	// First phase committed, drain pending
	assert!(wait_until(Duration::from_secs(2), || {
		cluster.job_store.latest_version().unwrap() == base.next()
	}));
	cluster.stop_executor();

	// New owner on another node resumes from persisted state
	cluster.start_executor(NodeId(2));
	cluster.release_session(NodeId(2), 9);

	let job = handle.wait().unwrap();
	assert_eq!(job.state, JobState::Done);

	// Replayed resumption produced no duplicate ladder step
	let entries = cluster.job_store.changes_up_to(SchemaVersion(u64::MAX)).unwrap();
	for (offset, entry) in entries.iter().enumerate() {
		assert_eq!(entry.version, SchemaVersion(offset as u64 + 1));
	}
	let states: Vec<SchemaState> = entries
		.iter()
		.filter_map(|entry| match &entry.change {
			SchemaChange::SetTable { def } => def.column("age").map(|c| c.state),
			_ => None,
		})
		.collect();
	assert_eq!(
		states,
		vec![
			SchemaState::DeleteOnly,
			SchemaState::WriteOnly,
			SchemaState::WriteReorg,
			SchemaState::Public,
		]
	);
}

#[test]
fn test_cancel_between_phases_rolls_back() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);
	let base = cluster.catalog.latest_version();

	// Hold the first ladder step at its drain wait
	cluster.pin_session(NodeId(2), 11);
	let handle = service
		.add_column(APP, "app", T1, "t1", test_column(3, "age", 2, Type::Int4))
		.unwrap();
	assert!(wait_until(Duration::from_secs(2), || {
		cluster.job_store.latest_version().unwrap() == base.next()
	}));

	// Cancel lands at the next phase boundary
	let job_id = handle.id();
	assert!(service.cancel(job_id).unwrap());
	cluster.release_session(NodeId(2), 11);

	assert_eq!(handle.wait().unwrap_err(), DdlError::Cancelled);
	let job = service.job(job_id).unwrap().unwrap();
	assert_eq!(job.state, JobState::RollbackDone);

	// The applied step was reverted by its own versioned change
	assert!(cluster.catalog.latest().unwrap().table(T1).unwrap().column("age").is_none());
	let entries = cluster.job_store.changes_up_to(SchemaVersion(u64::MAX)).unwrap();
	for (offset, entry) in entries.iter().enumerate() {
		assert_eq!(entry.version, SchemaVersion(offset as u64 + 1));
	}
}

#[test]
fn test_cancel_queued_job_applies_nothing() {
	let mut cluster = TestCluster::start(2);
	let service = setup(&cluster);
	let before = cluster.catalog.latest_version();

	// Queue a job with no executor running, cancel it, then restart
	cluster.stop_executor();
	let handle = service.rename_table(APP, "app", T1, "t1", "t2").unwrap();
	let job_id = handle.id();
	assert!(service.cancel(job_id).unwrap());
	cluster.start_executor(NodeId(1));

	assert_eq!(handle.wait().unwrap_err(), DdlError::Cancelled);
	let job = service.job(job_id).unwrap().unwrap();
	assert_eq!(job.state, JobState::Cancelled);
	assert_eq!(cluster.catalog.latest_version(), before);
}

#[test]
fn test_jobs_execute_in_submission_order() {
	let mut cluster = TestCluster::start(2);
	let service = setup(&cluster);

	// The second job depends on the first having run
	cluster.stop_executor();
	let create = service.create_table(APP, "app", test_table(2, 1, "t2")).unwrap();
	let rename = service.rename_table(APP, "app", TableId(2), "t2", "t3").unwrap();
	assert!(create.id() < rename.id());
	cluster.start_executor(NodeId(1));

	create.wait().unwrap();
	rename.wait().unwrap();
	assert!(cluster.catalog.latest().unwrap().table_by_name(APP, "t3").is_some());
}

#[test]
fn test_evicted_versions_are_rebuilt_from_history() {
	let mut config = TestCluster::fast_config();
	config.snapshot_cache_capacity = 2;
	let cluster = TestCluster::start_with_config(2, config);
	let service = setup(&cluster);

	service.rename_table(APP, "app", T1, "t1", "t2").unwrap().wait().unwrap();
	service.rename_table(APP, "app", T1, "t2", "t3").unwrap().wait().unwrap();
	service.rename_table(APP, "app", T1, "t3", "t4").unwrap().wait().unwrap();

	// Version 2 (table created, original name) long since fell out of
	// the two-entry ring; the history replay reconstructs it exactly
	let rebuilt = cluster.catalog.at_version(SchemaVersion(2)).unwrap();
	assert_eq!(rebuilt.version(), SchemaVersion(2));
	assert_eq!(rebuilt.table_by_name(APP, "t1").unwrap().id, T1);

	// Version 1: schema exists, table does not
	let rebuilt = cluster.catalog.at_version(SchemaVersion(1)).unwrap();
	assert!(rebuilt.schema_by_name("app").is_some());
	assert!(rebuilt.table(T1).is_none());
}

#[test]
fn test_remaining_actions_mutate_snapshot_metadata() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);

	service.alter_table_comment(APP, "app", T1, "t1", Some("orders".into()))
		.unwrap()
		.wait()
		.unwrap();
	service.rebase_auto_increment(APP, "app", T1, "t1", 500).unwrap().wait().unwrap();
	service.add_index(APP, "app", T1, "t1", test_index(1, "by_name", &["name"]))
		.unwrap()
		.wait()
		.unwrap();
	service.alter_index_visibility(APP, "app", T1, "t1", "by_name", true)
		.unwrap()
		.wait()
		.unwrap();
	service.rename_index(APP, "app", T1, "t1", "by_name", "names_idx")
		.unwrap()
		.wait()
		.unwrap();
	service.create_sequence(APP, "app", test_sequence(1, 1, "order_ids"))
		.unwrap()
		.wait()
		.unwrap();

	let snapshot = cluster.catalog.latest().unwrap();
	let table = snapshot.table(T1).unwrap();
	assert_eq!(table.comment.as_deref(), Some("orders"));
	assert_eq!(table.auto_increment, 500);
	let index = table.index("names_idx").unwrap();
	assert!(!index.visible);
	assert!(snapshot.sequence_by_name(APP, "order_ids").is_some());

	service.drop_sequence(APP, "app", "order_ids").unwrap().wait().unwrap();
	assert!(cluster
		.catalog
		.latest()
		.unwrap()
		.sequence_by_name(APP, "order_ids")
		.is_none());
}

#[test]
fn test_drop_column_ladder_removes_column() {
	let cluster = TestCluster::start(2);
	let service = setup(&cluster);

	service.drop_column(APP, "app", T1, "t1", "name").unwrap().wait().unwrap();

	let table = cluster.catalog.latest().unwrap().table(T1).unwrap().clone();
	assert!(table.column("name").is_none());
	assert!(table.column("id").is_some());

	// Reads lost the column before writes did
	let entries = cluster.job_store.changes_up_to(SchemaVersion(u64::MAX)).unwrap();
	let states: Vec<Option<SchemaState>> = entries
		.iter()
		.filter_map(|entry| match &entry.change {
			SchemaChange::SetTable { def } => Some(def.column("name").map(|c| c.state)),
			_ => None,
		})
		.collect();
	assert_eq!(
		states,
		vec![
			Some(SchemaState::WriteOnly),
			Some(SchemaState::DeleteOnly),
			Some(SchemaState::DeleteReorg),
			None,
		]
	);
}
