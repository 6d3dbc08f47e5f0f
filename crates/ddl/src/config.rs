// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::time::Duration;

use tessera_core::RetryPolicy;

/// Tuning knobs for the DDL coordinator. Passed by value at
/// construction; no ambient configuration.
#[derive(Debug, Clone)]
pub struct DdlConfig {
	/// Owner lease duration. Renewal failure past this point means
	/// another node may take over.
	pub lease_ttl: Duration,
	/// How often the owner renews its lease. Must be well below
	/// `lease_ttl`.
	pub lease_renew_interval: Duration,
	/// How long a standby waits between attempts to take the lease.
	pub lease_retry_interval: Duration,
	/// Executor sleep when the job queue is empty.
	pub idle_interval: Duration,
	/// MDL drain checker tick.
	pub check_interval: Duration,
	/// Version syncer poll while waiting for drain confirmations.
	pub drain_poll_interval: Duration,
	/// One drain-wait deadline. Exceeding it raises the timeout metric
	/// and logs, but the wait continues — there is no
	/// proceed-without-ack path.
	pub drain_timeout: Duration,
	/// Bounded retry for transient storage conflicts during a phase.
	pub retry: RetryPolicy,
	/// Capacity of the checker's report-dedup cache. On overflow the
	/// cache is cleared wholesale and some redundant reports are
	/// accepted.
	pub report_cache_capacity: usize,
	/// Number of snapshots the info cache ring keeps before old
	/// versions fall back to history replay.
	pub snapshot_cache_capacity: usize,
}

impl Default for DdlConfig {
	fn default() -> Self {
		Self {
			lease_ttl: Duration::from_secs(10),
			lease_renew_interval: Duration::from_secs(2),
			lease_retry_interval: Duration::from_millis(500),
			idle_interval: Duration::from_millis(50),
			check_interval: Duration::from_millis(50),
			drain_poll_interval: Duration::from_millis(10),
			drain_timeout: Duration::from_secs(10),
			retry: RetryPolicy::default(),
			report_cache_capacity: 1000,
			snapshot_cache_capacity: 16,
		}
	}
}
