// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory connection table with row locks
//!
//! Transactions buffer their writes and apply them in one step on commit.
//! A locking read holds the row name until the transaction ends; a second
//! transaction waiting longer than the row lock timeout is aborted, which
//! is how lock contention surfaces to callers.

use crate::image::TableImage;
use crate::table::{
    columns, ConnectionRow, ConnectionTable, IndexDescription, StoreError, TableTransaction,
};
use crate::wal::{RowWrite, TableOp, Wal};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct TableState {
    image: TableImage,
    /// Row name to owning transaction
    row_locks: HashMap<String, u64>,
}

#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    max_in_clause: usize,
    row_lock_timeout: Duration,
    state: Mutex<TableState>,
    row_released: Condvar,
    wal: Option<Mutex<Wal>>,
    next_txn: AtomicU64,
    pending_aborts: AtomicUsize,
}

impl MemoryTable {
    /// Volatile table
    pub fn new(name: impl Into<String>, max_in_clause: usize, row_lock_timeout: Duration) -> Self {
        Self::with_image(name.into(), max_in_clause, row_lock_timeout, TableImage::default(), None)
    }

    /// Table persisted to the write-ahead log at `path`, replaying it first
    pub fn open(
        name: impl Into<String>,
        path: &Path,
        max_in_clause: usize,
        row_lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let name = name.into();
        let (wal, ops) = Wal::open(path)?;
        let image = TableImage::replay(&ops);
        tracing::info!(
            table = %name,
            ops = ops.len(),
            rows = image.rows.len(),
            "table replayed"
        );
        Ok(Self::with_image(
            name,
            max_in_clause,
            row_lock_timeout,
            image,
            Some(Mutex::new(wal)),
        ))
    }

    fn with_image(
        name: String,
        max_in_clause: usize,
        row_lock_timeout: Duration,
        image: TableImage,
        wal: Option<Mutex<Wal>>,
    ) -> Self {
        Self {
            name,
            max_in_clause: max_in_clause.max(1),
            row_lock_timeout,
            state: Mutex::new(TableState {
                image,
                row_locks: HashMap::new(),
            }),
            row_released: Condvar::new(),
            wal,
            next_txn: AtomicU64::new(1),
            pending_aborts: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` commits fail as if aborted by lock contention
    pub fn inject_transaction_aborts(&self, count: usize) {
        self.pending_aborts.fetch_add(count, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.lock_state().image.rows.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn installed_state(&self) -> Result<MutexGuard<'_, TableState>, StoreError> {
        let state = self.lock_state();
        if state.image.installed {
            Ok(state)
        } else {
            Err(StoreError::TableMissing(self.name.clone()))
        }
    }

    /// Persist then apply; callers hold the state lock so the log order is
    /// the apply order
    fn record(&self, state: &mut TableState, op: TableOp) -> Result<(), StoreError> {
        if let Some(wal) = &self.wal {
            wal.lock()
                .unwrap_or_else(|e| e.into_inner())
                .append(op.clone())?;
        }
        state.image.apply(&op);
        Ok(())
    }

    fn take_injected_abort(&self) -> bool {
        self.pending_aborts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn lock_row(&self, txn: u64, row: &str) -> Result<(), StoreError> {
        let deadline = Instant::now() + self.row_lock_timeout;
        let mut state = self.lock_state();
        loop {
            match state.row_locks.get(row).copied() {
                None => {
                    state.row_locks.insert(row.to_string(), txn);
                    return Ok(());
                }
                Some(owner) if owner == txn => return Ok(()),
                Some(_) => {}
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(table = %self.name, row, "row lock wait timed out");
                return Err(StoreError::TransactionAborted(format!(
                    "lock wait on '{row}' in {} timed out",
                    self.name
                )));
            }
            state = self
                .row_released
                .wait_timeout(state, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    fn release_rows(&self, txn: u64, rows: &[String]) {
        if rows.is_empty() {
            return;
        }
        let mut state = self.lock_state();
        for row in rows {
            if state.row_locks.get(row) == Some(&txn) {
                state.row_locks.remove(row);
            }
        }
        drop(state);
        self.row_released.notify_all();
    }

    fn committed_row(&self, name: &str) -> Option<ConnectionRow> {
        self.lock_state().image.rows.get(name).cloned()
    }
}

impl ConnectionTable for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn max_in_clause(&self) -> usize {
        self.max_in_clause
    }

    fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.installed_state()?.image.rows.keys().cloned().collect())
    }

    fn fetch(&self, names: &[String]) -> Result<Vec<ConnectionRow>, StoreError> {
        if names.len() > self.max_in_clause {
            return Err(StoreError::TooManyKeys {
                count: names.len(),
                limit: self.max_in_clause,
            });
        }
        let state = self.installed_state()?;
        Ok(names
            .iter()
            .filter_map(|name| state.image.rows.get(name).cloned())
            .collect())
    }

    fn find_by_class(&self, class_name: &str) -> Result<Vec<String>, StoreError> {
        let state = self.installed_state()?;
        Ok(state
            .image
            .rows
            .values()
            .filter(|row| row.class_name == class_name)
            .map(|row| row.name.clone())
            .collect())
    }

    fn begin(&self) -> Result<Box<dyn TableTransaction + '_>, StoreError> {
        drop(self.installed_state()?);
        Ok(Box::new(MemoryTransaction {
            table: self,
            id: self.next_txn.fetch_add(1, Ordering::SeqCst),
            writes: BTreeMap::new(),
            locked: Vec::new(),
        }))
    }

    fn is_installed(&self) -> bool {
        self.lock_state().image.installed
    }

    fn create_table(&self) -> Result<(), StoreError> {
        let mut state = self.lock_state();
        if state.image.installed {
            return Ok(());
        }
        self.record(&mut state, TableOp::CreateTable)?;
        let pkey = IndexDescription::new(format!("{}_pkey", self.name), true, &[columns::NAME]);
        self.record(&mut state, TableOp::AddIndex { index: pkey })?;
        tracing::info!(table = %self.name, "table created");
        Ok(())
    }

    fn drop_table(&self) -> Result<(), StoreError> {
        let mut state = self.installed_state()?;
        self.record(&mut state, TableOp::DropTable)?;
        tracing::info!(table = %self.name, "table dropped");
        Ok(())
    }

    fn indexes(&self) -> Result<Vec<IndexDescription>, StoreError> {
        Ok(self.installed_state()?.image.indexes.values().cloned().collect())
    }

    fn add_index(&self, index: IndexDescription) -> Result<(), StoreError> {
        let mut state = self.installed_state()?;
        self.record(&mut state, TableOp::AddIndex { index })
    }

    fn drop_index(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.installed_state()?;
        if !state.image.indexes.contains_key(name) {
            return Err(StoreError::IndexMissing(name.to_string()));
        }
        self.record(
            &mut state,
            TableOp::DropIndex {
                name: name.to_string(),
            },
        )
    }
}

struct MemoryTransaction<'a> {
    table: &'a MemoryTable,
    id: u64,
    /// Buffered writes; `None` deletes the row
    writes: BTreeMap<String, Option<ConnectionRow>>,
    locked: Vec<String>,
}

impl MemoryTransaction<'_> {
    fn lock(&mut self, row: &str) -> Result<(), StoreError> {
        if !self.locked.iter().any(|r| r == row) {
            self.table.lock_row(self.id, row)?;
            self.locked.push(row.to_string());
        }
        Ok(())
    }

    fn current(&self, row: &str) -> Option<ConnectionRow> {
        match self.writes.get(row) {
            Some(pending) => pending.clone(),
            None => self.table.committed_row(row),
        }
    }
}

impl TableTransaction for MemoryTransaction<'_> {
    fn select_for_update(&mut self, name: &str) -> Result<Option<ConnectionRow>, StoreError> {
        self.lock(name)?;
        Ok(self.current(name))
    }

    fn insert(&mut self, row: ConnectionRow) -> Result<(), StoreError> {
        self.lock(&row.name)?;
        if self.current(&row.name).is_some() {
            return Err(StoreError::DuplicateKey(row.name));
        }
        self.writes.insert(row.name.clone(), Some(row));
        Ok(())
    }

    fn update(&mut self, row: ConnectionRow) -> Result<(), StoreError> {
        self.lock(&row.name)?;
        if self.current(&row.name).is_none() {
            return Err(StoreError::RowMissing(row.name));
        }
        self.writes.insert(row.name.clone(), Some(row));
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        self.lock(name)?;
        let existed = self.current(name).is_some();
        if existed {
            self.writes.insert(name.to_string(), None);
        }
        Ok(existed)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        if self.table.take_injected_abort() {
            tracing::debug!(table = %self.table.name, txn = self.id, "injected transaction abort");
            return Err(StoreError::TransactionAborted(format!(
                "transaction {} chosen as deadlock victim",
                self.id
            )));
        }
        let writes: Vec<RowWrite> = std::mem::take(&mut self.writes)
            .into_iter()
            .map(|(name, row)| match row {
                Some(row) => RowWrite::Put { row },
                None => RowWrite::Delete { name },
            })
            .collect();
        if writes.is_empty() {
            return Ok(());
        }
        let mut state = self.table.installed_state()?;
        self.table.record(&mut state, TableOp::Commit { writes })
    }

    fn rollback(self: Box<Self>) {
        tracing::trace!(table = %self.table.name, txn = self.id, "transaction rolled back");
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        self.table.release_rows(self.id, &self.locked);
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
