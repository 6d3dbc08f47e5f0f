// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Job and lease store implementations.
//!
//! The traits live in `tessera-core::interface`; this module provides
//! the in-memory implementations used for embedded deployments and
//! tests. Distributed deployments back the same traits with the shared
//! storage layer.

mod memory;

pub use memory::{MemoryJobStore, MemoryLeaseStore};
