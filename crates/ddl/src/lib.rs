// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

// #![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(not(debug_assertions), deny(warnings))]
// #![cfg_attr(not(debug_assertions), deny(clippy::unwrap_used))]
// #![cfg_attr(not(debug_assertions), deny(clippy::expect_used))]

pub use config::DdlConfig;
pub use context::DdlContext;
pub use error::{DdlError, Result, ValidationError};
pub use executor::{ExecutorHandle, JobExecutor};
pub use owner::OwnerLease;
pub use service::{CompletionBoard, DdlService, JobHandle, JobOutcome};
pub use store::{MemoryJobStore, MemoryLeaseStore};
pub use sync::{
	CheckerState, DrainTable, DrainWait, MdlChecker, MdlCheckerHandle, VersionReporter,
	VersionSyncer,
};

mod config;
mod context;
mod error;
mod executor;
mod handler;
mod owner;
mod service;
mod store;
mod sync;
