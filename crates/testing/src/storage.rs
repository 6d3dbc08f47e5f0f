// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use tessera_core::{
	SchemaVersion, TableId,
	interface::{RowStorage, RowTransaction},
};

/// In-memory row store for backfill phases. Writes buffer in the
/// transaction and land atomically on commit; reads go to the committed
/// state (the control plane never needs more isolation than that in
/// tests).
#[derive(Clone, Default)]
pub struct MemoryRowStorage {
	rows: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryRowStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed a committed row of `table` directly, bypassing transactions.
	pub fn seed_row(&self, table: TableId, key: &[u8], value: &[u8]) {
		self.rows.lock().insert(row_key(table, key), value.to_vec());
	}

	/// All committed keys starting with `prefix`; used to assert on
	/// backfilled index entries.
	pub fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
		self.rows
			.lock()
			.keys()
			.filter(|k| k.starts_with(prefix))
			.cloned()
			.collect()
	}
}

pub fn row_key(table: TableId, key: &[u8]) -> Vec<u8> {
	let mut full = Vec::with_capacity(1 + 8 + key.len());
	full.push(b'r');
	full.extend_from_slice(&table.0.to_be_bytes());
	full.extend_from_slice(key);
	full
}

impl RowStorage for MemoryRowStorage {
	fn begin(&self, _version: SchemaVersion) -> tessera_core::Result<Box<dyn RowTransaction + '_>> {
		Ok(Box::new(MemoryRowTransaction {
			storage: self,
			pending: Vec::new(),
		}))
	}
}

struct MemoryRowTransaction<'a> {
	storage: &'a MemoryRowStorage,
	pending: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RowTransaction for MemoryRowTransaction<'_> {
	fn get(&mut self, key: &[u8]) -> tessera_core::Result<Option<Vec<u8>>> {
		Ok(self.storage.rows.lock().get(key).cloned())
	}

	fn scan(&mut self, table: TableId) -> tessera_core::Result<Vec<(Vec<u8>, Vec<u8>)>> {
		let prefix = row_key(table, b"");
		Ok(self
			.storage
			.rows
			.lock()
			.range(prefix.clone()..)
			.take_while(|(k, _)| k.starts_with(&prefix))
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect())
	}

	fn put(&mut self, key: &[u8], value: Vec<u8>) -> tessera_core::Result<()> {
		self.pending.push((key.to_vec(), value));
		Ok(())
	}

	fn commit(self: Box<Self>) -> tessera_core::Result<()> {
		let mut rows = self.storage.rows.lock();
		for (key, value) in self.pending {
			rows.insert(key, value);
		}
		Ok(())
	}

	fn rollback(self: Box<Self>) -> tessera_core::Result<()> {
		Ok(())
	}
}
