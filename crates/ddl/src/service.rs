// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashMap;
use tessera_core::{
	ActionKind, DdlJob, JobArgs, JobId, JobState, SchemaId, SchemaVersion, TableId,
	def::{ColumnDef, IndexDef, PartitionDef, SchemaDef, SequenceDef, TableDef},
};
use tracing::info;

use crate::{DdlError, Result, context::DdlContext};

/// Terminal result delivered to a blocked submitter.
pub type JobOutcome = Result<DdlJob>;

/// Maps running jobs to the channel their submitter blocks on. The
/// executor notifies exactly once, when the job reaches a terminal
/// state; jobs submitted on another node simply have no entry here.
#[derive(Clone, Default)]
pub struct CompletionBoard {
	inner: Arc<DashMap<JobId, Sender<JobOutcome>>>,
}

impl CompletionBoard {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, job: JobId) -> Receiver<JobOutcome> {
		let (tx, rx) = bounded(1);
		self.inner.insert(job, tx);
		rx
	}

	pub fn notify(&self, job: JobId, outcome: JobOutcome) {
		if let Some((_, tx)) = self.inner.remove(&job) {
			let _ = tx.send(outcome);
		}
	}
}

/// Handle returned from submission; blocks until the job reaches a
/// terminal state.
pub struct JobHandle {
	job: JobId,
	rx: Receiver<JobOutcome>,
}

impl JobHandle {
	pub fn id(&self) -> JobId {
		self.job
	}

	/// Block until the job finishes. A validation failure or
	/// cancellation surfaces as the job's error; a timeout-stalled job
	/// keeps the caller blocked — there is no silent partial
	/// application.
	pub fn wait(self) -> JobOutcome {
		match self.rx.recv() {
			Ok(outcome) => outcome,
			Err(_) => Err(DdlError::Store(tessera_core::Error::Storage(
				"executor shut down before job completion".into(),
			))),
		}
	}

	/// Like [`Self::wait`], bounded. `None` means the job is still
	/// pending.
	pub fn wait_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
		self.rx.recv_timeout(timeout).ok()
	}
}

/// Submission facade: one method per action. Each builds a job, assigns
/// the next id, appends it to the store, and hands back a handle the
/// caller can block on.
#[derive(Clone)]
pub struct DdlService {
	ctx: DdlContext,
}

impl DdlService {
	pub fn new(ctx: DdlContext) -> Self {
		Self { ctx }
	}

	pub fn create_schema(&self, def: SchemaDef) -> Result<JobHandle> {
		let (schema_id, schema_name) = (def.id, def.name.clone());
		self.submit(
			schema_id,
			schema_name,
			TableId(0),
			String::new(),
			ActionKind::CreateSchema,
			JobArgs::CreateSchema { def },
		)
	}

	pub fn drop_schema(&self, schema_id: SchemaId, schema_name: &str) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			TableId(0),
			String::new(),
			ActionKind::DropSchema,
			JobArgs::None,
		)
	}

	pub fn create_table(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		def: TableDef,
	) -> Result<JobHandle> {
		let (table_id, table_name) = (def.id, def.name.clone());
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name,
			ActionKind::CreateTable,
			JobArgs::CreateTable { def },
		)
	}

	pub fn drop_table(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::DropTable,
			JobArgs::None,
		)
	}

	pub fn truncate_table(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::TruncateTable,
			JobArgs::None,
		)
	}

	pub fn rename_table(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		to: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::RenameTable,
			JobArgs::RenameTable { to: to.to_string() },
		)
	}

	pub fn add_column(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		column: ColumnDef,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::AddColumn,
			JobArgs::AddColumn { column },
		)
	}

	pub fn drop_column(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		column: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::DropColumn,
			JobArgs::DropColumn { column: column.to_string() },
		)
	}

	pub fn add_index(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		index: IndexDef,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::AddIndex,
			JobArgs::AddIndex { index },
		)
	}

	pub fn drop_index(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		index: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::DropIndex,
			JobArgs::DropIndex { index: index.to_string() },
		)
	}

	pub fn rename_index(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		from: &str,
		to: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::RenameIndex,
			JobArgs::RenameIndex {
				from: from.to_string(),
				to: to.to_string(),
			},
		)
	}

	pub fn alter_index_visibility(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		index: &str,
		invisible: bool,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::AlterIndexVisibility,
			JobArgs::AlterIndexVisibility {
				index: index.to_string(),
				invisible,
			},
		)
	}

	pub fn add_table_partition(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		partition: PartitionDef,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::AddTablePartition,
			JobArgs::AddPartition { partition },
		)
	}

	pub fn drop_table_partition(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		partition: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::DropTablePartition,
			JobArgs::DropPartition { partition: partition.to_string() },
		)
	}

	pub fn truncate_table_partition(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		partition: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::TruncateTablePartition,
			JobArgs::TruncatePartition { partition: partition.to_string() },
		)
	}

	pub fn rebase_auto_increment(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		base: u64,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::RebaseAutoIncrement,
			JobArgs::RebaseAutoIncrement { base },
		)
	}

	pub fn alter_table_comment(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		table_id: TableId,
		table_name: &str,
		comment: Option<String>,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			table_id,
			table_name.to_string(),
			ActionKind::AlterTableComment,
			JobArgs::AlterTableComment { comment },
		)
	}

	pub fn create_sequence(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		def: SequenceDef,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			TableId(0),
			String::new(),
			ActionKind::CreateSequence,
			JobArgs::CreateSequence { def },
		)
	}

	pub fn drop_sequence(
		&self,
		schema_id: SchemaId,
		schema_name: &str,
		sequence: &str,
	) -> Result<JobHandle> {
		self.submit(
			schema_id,
			schema_name.to_string(),
			TableId(0),
			String::new(),
			ActionKind::DropSequence,
			JobArgs::DropSequence { sequence: sequence.to_string() },
		)
	}

	/// Administrative cancellation. Queued and between-phase jobs
	/// honor it at the next phase boundary; terminal jobs return false.
	pub fn cancel(&self, job: JobId) -> Result<bool> {
		Ok(self.ctx.store.request_cancel(job)?)
	}

	pub fn job(&self, job: JobId) -> Result<Option<DdlJob>> {
		Ok(self.ctx.store.get(job)?)
	}

	fn submit(
		&self,
		schema_id: SchemaId,
		schema_name: String,
		table_id: TableId,
		table_name: String,
		action: ActionKind,
		args: JobArgs,
	) -> Result<JobHandle> {
		let id = self.ctx.store.next_job_id()?;
		let job = DdlJob {
			id,
			schema_id,
			schema_name,
			table_id,
			table_name,
			action,
			args,
			schema_state: action.initial_state(),
			state: JobState::Queued,
			error: None,
			snapshot_version: self.ctx.catalog.latest_version(),
			version: SchemaVersion::ZERO,
			owner: None,
			cancel_requested: false,
		};
		let rx = self.ctx.completions.register(id);
		self.ctx.store.append(job)?;
		info!(job = id.0, %action, "ddl job submitted");
		Ok(JobHandle { job: id, rx })
	}
}
