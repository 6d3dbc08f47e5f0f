// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{thread::sleep, time::Duration};

use tracing::debug;

use crate::error::{Error, Result};

/// Bounded-attempt backoff for transient storage conflicts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub initial_backoff: Duration,
	pub max_backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			initial_backoff: Duration::from_millis(10),
			max_backoff: Duration::from_millis(500),
		}
	}
}

/// Run `f`, retrying `Error::Conflict` with doubling backoff up to
/// `policy.max_attempts`. Any other error, and a conflict on the final
/// attempt, propagate to the caller.
pub fn retry<T>(policy: &RetryPolicy, mut f: impl FnMut() -> Result<T>) -> Result<T> {
	let mut backoff = policy.initial_backoff;
	let mut attempt = 1;
	loop {
		match f() {
			Err(Error::Conflict(reason)) if attempt < policy.max_attempts => {
				debug!(attempt, %reason, "transient conflict, retrying");
				sleep(backoff);
				backoff = (backoff * 2).min(policy.max_backoff);
				attempt += 1;
			}
			other => return other,
		}
	}
}
