// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use crate::{id::SessionId, version::SchemaVersion};

/// A locally active session and the schema version its open transaction
/// is pinned to. The pin is set atomically with transaction begin and
/// never moves before commit/rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
	pub session: SessionId,
	pub pinned_version: SchemaVersion,
	pub started_at_ms: u64,
}

/// Read-only view of this node's active sessions; purely local, no
/// cross-node coordination.
pub trait SessionRegistry: Send + Sync {
	fn active_sessions(&self) -> Vec<SessionInfo>;
}
