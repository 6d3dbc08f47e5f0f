// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::Arc;

use tessera_catalog::Catalog;
use tessera_core::{
	NodeId,
	interface::{ChangeLog, JobStore, RowStorage},
};

use crate::{config::DdlConfig, service::CompletionBoard, sync::VersionSyncer};

/// Everything one node's DDL machinery needs, bundled once at process
/// start and passed by handle to the executor, service, and checker —
/// explicit construction, no runtime discovery.
#[derive(Clone)]
pub struct DdlContext {
	pub node: NodeId,
	pub store: Arc<dyn JobStore>,
	pub log: Arc<dyn ChangeLog>,
	pub catalog: Catalog,
	pub syncer: Arc<VersionSyncer>,
	pub storage: Arc<dyn RowStorage>,
	pub completions: CompletionBoard,
	pub config: DdlConfig,
}
