// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{collections::HashMap, sync::Arc, time::Duration};

use tessera_catalog::Catalog;
use tessera_core::{Metrics, NodeId, RetryPolicy, SessionId};
use tessera_ddl::{
	CompletionBoard, DdlConfig, DdlContext, DdlService, DrainTable, ExecutorHandle,
	JobExecutor, MdlChecker, MdlCheckerHandle, MemoryJobStore, MemoryLeaseStore, OwnerLease,
	VersionSyncer,
};
use tracing::debug;

use crate::{cluster::StaticClusterView, sessions::TestSessionRegistry, storage::MemoryRowStorage};

/// A whole control plane in one process: a shared job/lease store, one
/// executor, and one drain checker plus session registry per simulated
/// node. Timings are shrunk so tests settle in milliseconds.
pub struct TestCluster {
	pub config: DdlConfig,
	pub job_store: Arc<MemoryJobStore>,
	pub lease_store: Arc<MemoryLeaseStore>,
	pub cluster_view: Arc<StaticClusterView>,
	pub metrics: Arc<Metrics>,
	pub storage: Arc<MemoryRowStorage>,
	pub catalog: Catalog,
	pub syncer: Arc<VersionSyncer>,
	pub completions: CompletionBoard,
	sessions: HashMap<NodeId, Arc<TestSessionRegistry>>,
	checkers: HashMap<NodeId, MdlCheckerHandle>,
	executor: Option<ExecutorHandle>,
}

impl TestCluster {
	pub fn fast_config() -> DdlConfig {
		DdlConfig {
			lease_ttl: Duration::from_millis(500),
			lease_renew_interval: Duration::from_millis(20),
			lease_retry_interval: Duration::from_millis(5),
			idle_interval: Duration::from_millis(5),
			check_interval: Duration::from_millis(5),
			drain_poll_interval: Duration::from_millis(2),
			drain_timeout: Duration::from_millis(150),
			retry: RetryPolicy {
				max_attempts: 3,
				initial_backoff: Duration::from_millis(1),
				max_backoff: Duration::from_millis(5),
			},
			report_cache_capacity: 1000,
			snapshot_cache_capacity: 16,
		}
	}

	/// Bring up `nodes` drain checkers and start the executor on the
	/// first node.
	pub fn start(nodes: u64) -> Self {
		Self::start_with_config(nodes, Self::fast_config())
	}

	pub fn start_with_config(nodes: u64, config: DdlConfig) -> Self {
		let job_store = Arc::new(MemoryJobStore::new());
		let lease_store = Arc::new(MemoryLeaseStore::new());
		let node_ids: Vec<NodeId> = (1..=nodes).map(NodeId).collect();
		let cluster_view = Arc::new(StaticClusterView::new(node_ids.clone()));
		let metrics = Arc::new(Metrics::new());
		let storage = Arc::new(MemoryRowStorage::new());
		let catalog = Catalog::new(config.snapshot_cache_capacity, job_store.clone());
		let drain = Arc::new(DrainTable::new());
		let syncer = Arc::new(VersionSyncer::new(
			drain,
			cluster_view.clone(),
			metrics.clone(),
			config.drain_poll_interval,
			config.drain_timeout,
		));
		let completions = CompletionBoard::new();

		let mut cluster = Self {
			config,
			job_store,
			lease_store,
			cluster_view,
			metrics,
			storage,
			catalog,
			syncer,
			completions,
			sessions: HashMap::new(),
			checkers: HashMap::new(),
			executor: None,
		};
		for node in node_ids {
			cluster.start_checker(node);
		}
		cluster.start_executor(NodeId(1));
		cluster
	}

	pub fn context(&self, node: NodeId) -> DdlContext {
		DdlContext {
			node,
			store: self.job_store.clone(),
			log: self.job_store.clone(),
			catalog: self.catalog.clone(),
			syncer: self.syncer.clone(),
			storage: self.storage.clone(),
			completions: self.completions.clone(),
			config: self.config.clone(),
		}
	}

	pub fn service(&self) -> DdlService {
		DdlService::new(self.context(NodeId(1)))
	}

	pub fn sessions(&self, node: NodeId) -> Arc<TestSessionRegistry> {
		self.sessions.get(&node).expect("unknown node").clone()
	}

	/// Pin a session on `node` at the catalog's current version,
	/// simulating a transaction begin.
	pub fn pin_session(&self, node: NodeId, session: u64) {
		self.sessions(node).begin(SessionId(session), self.catalog.latest_version());
	}

	pub fn release_session(&self, node: NodeId, session: u64) {
		self.sessions(node).end(SessionId(session));
	}

	pub fn start_checker(&mut self, node: NodeId) {
		let sessions = self
			.sessions
			.entry(node)
			.or_insert_with(|| Arc::new(TestSessionRegistry::new()))
			.clone();
		let checker = MdlChecker::new(
			node,
			self.syncer.drain_table().clone(),
			sessions,
			self.syncer.clone(),
			self.metrics.clone(),
			self.config.check_interval,
			self.config.report_cache_capacity,
		);
		self.checkers.insert(node, checker.spawn());
		debug!(node = node.0, "test checker started");
	}

	/// Simulate a node becoming unreachable: its checker stops
	/// reporting while the cluster view still lists it.
	pub fn stop_checker(&mut self, node: NodeId) {
		if let Some(mut handle) = self.checkers.remove(&node) {
			handle.stop();
		}
	}

	pub fn start_executor(&mut self, node: NodeId) {
		let lease = OwnerLease::new(
			node,
			self.lease_store.clone(),
			self.config.lease_ttl,
			self.config.lease_renew_interval,
		);
		self.executor = Some(JobExecutor::spawn(self.context(node), lease));
	}

	/// Stop the executor mid-flight, simulating owner loss. Any drain
	/// wait is interrupted and the running job stays persisted for the
	/// next owner.
	pub fn stop_executor(&mut self) {
		if let Some(mut handle) = self.executor.take() {
			handle.stop();
		}
	}
}

impl Drop for TestCluster {
	fn drop(&mut self) {
		self.stop_executor();
		let nodes: Vec<NodeId> = self.checkers.keys().copied().collect();
		for node in nodes {
			self.stop_checker(node);
		}
	}
}
