// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Version synchronization: publishing a committed schema version and
//! draining the cluster's dependencies on the previous one.
//!
//! The owner arms a drain entry per pending job; every node's checker
//! resolves the entry against its locally active sessions and reports
//! back; the syncer releases the owner once all live nodes have
//! confirmed.

mod checker;
mod drain;
mod syncer;

pub use checker::{CheckerState, MdlChecker, MdlCheckerHandle};
pub use drain::DrainTable;
pub use syncer::{DrainWait, VersionReporter, VersionSyncer};
