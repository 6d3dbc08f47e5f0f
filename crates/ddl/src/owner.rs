// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::{Duration, Instant},
};

use parking_lot::Mutex;
use tessera_core::{NodeId, interface::LeaseStore};
use tracing::{info, warn};

/// This node's view of the owner lease.
///
/// The lease store is the authority: whenever acquisition or renewal
/// fails — for any reason, including a store error — the node stops
/// acting as owner immediately, even if it believes wall-clock time
/// remains. Safety (never two owners) is chosen over liveness.
pub struct OwnerLease {
	node: NodeId,
	store: Arc<dyn LeaseStore>,
	ttl: Duration,
	renew_interval: Duration,
	is_owner: AtomicBool,
	last_renewal: Mutex<Option<Instant>>,
}

impl OwnerLease {
	pub fn new(
		node: NodeId,
		store: Arc<dyn LeaseStore>,
		ttl: Duration,
		renew_interval: Duration,
	) -> Self {
		Self {
			node,
			store,
			ttl,
			renew_interval,
			is_owner: AtomicBool::new(false),
			last_renewal: Mutex::new(None),
		}
	}

	pub fn node(&self) -> NodeId {
		self.node
	}

	pub fn is_owner(&self) -> bool {
		self.is_owner.load(Ordering::SeqCst)
	}

	/// Acquire or keep the lease. Returns whether this node is the
	/// owner afterwards.
	///
	/// Held leases are renewed once `renew_interval` has elapsed;
	/// between renewals the held state is trusted. Called at the top of
	/// every executor iteration and before every phase commit.
	pub fn ensure(&self) -> bool {
		if self.is_owner() {
			let due = {
				let last = self.last_renewal.lock();
				last.map_or(true, |at| at.elapsed() >= self.renew_interval)
			};
			if !due {
				return true;
			}
			return match self.store.renew(self.node, self.ttl) {
				Ok(true) => {
					*self.last_renewal.lock() = Some(Instant::now());
					true
				}
				Ok(false) => {
					warn!(node = self.node.0, "owner lease lost at renewal");
					self.step_down();
					false
				}
				Err(error) => {
					// Renewal state unknown: assume lost.
					warn!(node = self.node.0, %error, "owner lease renewal failed");
					self.step_down();
					false
				}
			};
		}

		match self.store.try_acquire(self.node, self.ttl) {
			Ok(true) => {
				info!(node = self.node.0, "acquired owner lease");
				self.is_owner.store(true, Ordering::SeqCst);
				*self.last_renewal.lock() = Some(Instant::now());
				true
			}
			Ok(false) => false,
			Err(error) => {
				warn!(node = self.node.0, %error, "owner lease acquisition failed");
				false
			}
		}
	}

	/// Stop acting as owner without touching the store (the lease may
	/// already belong to someone else).
	pub fn step_down(&self) {
		self.is_owner.store(false, Ordering::SeqCst);
		*self.last_renewal.lock() = None;
	}

	/// Voluntarily give the lease back on shutdown.
	pub fn release(&self) {
		if self.is_owner.swap(false, Ordering::SeqCst) {
			if let Err(error) = self.store.release(self.node) {
				warn!(node = self.node.0, %error, "owner lease release failed");
			}
		}
	}
}
