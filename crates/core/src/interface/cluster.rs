// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use crate::id::NodeId;

/// The set of nodes the version syncer requires drain confirmations
/// from. Membership changes take effect on the syncer's next poll.
pub trait ClusterView: Send + Sync {
	fn live_nodes(&self) -> Vec<NodeId>;
}
