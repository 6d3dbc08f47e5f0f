// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use dashmap::DashMap;
use tessera_core::{
	SchemaVersion, SessionId, now_millis,
	interface::{SessionInfo, SessionRegistry},
};

/// Session registry under test control: tests pin and release sessions
/// to simulate transactions holding metadata locks.
#[derive(Default)]
pub struct TestSessionRegistry {
	sessions: DashMap<SessionId, SessionInfo>,
}

impl TestSessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Begin a transaction pinned at `version`. The pin never moves
	/// until [`Self::end`].
	pub fn begin(&self, session: SessionId, version: SchemaVersion) {
		self.sessions.insert(
			session,
			SessionInfo {
				session,
				pinned_version: version,
				started_at_ms: now_millis(),
			},
		);
	}

	pub fn end(&self, session: SessionId) {
		self.sessions.remove(&session);
	}
}

impl SessionRegistry for TestSessionRegistry {
	fn active_sessions(&self) -> Vec<SessionInfo> {
		self.sessions.iter().map(|entry| entry.value().clone()).collect()
	}
}
