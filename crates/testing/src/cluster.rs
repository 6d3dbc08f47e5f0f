// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use parking_lot::RwLock;
use tessera_core::{NodeId, interface::ClusterView};

/// Cluster membership under test control: nodes can be declared live or
/// lost at any point, taking effect on the syncer's next poll.
pub struct StaticClusterView {
	nodes: RwLock<Vec<NodeId>>,
}

impl StaticClusterView {
	pub fn new(nodes: Vec<NodeId>) -> Self {
		Self {
			nodes: RwLock::new(nodes),
		}
	}

	pub fn add(&self, node: NodeId) {
		let mut nodes = self.nodes.write();
		if !nodes.contains(&node) {
			nodes.push(node);
		}
	}

	pub fn remove(&self, node: NodeId) {
		self.nodes.write().retain(|n| *n != node);
	}
}

impl ClusterView for StaticClusterView {
	fn live_nodes(&self) -> Vec<NodeId> {
		self.nodes.read().clone()
	}
}
