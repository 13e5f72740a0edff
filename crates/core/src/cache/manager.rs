// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache manager: sections, creation, invalidation and transactions

use super::description::{CacheDescription, ObjectKey};
use super::store::{Entry, ObjectStore, Value};
use crate::clock::Clock;
use crate::id::TransactionId;
use crate::lock::{LockError, LockManager, LockMode, SectionKey};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use thiserror::Error;

/// Lock namespace for invalidation keys
const LOCK_PREFIX: &str = "_Cache_";

fn lock_name(key: &str) -> String {
    format!("{LOCK_PREFIX}{key}")
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("cache transaction {0} already exists")]
    DuplicateTransaction(TransactionId),
    #[error("no cache transaction {0}")]
    UnknownTransaction(TransactionId),
    #[error("cache transaction {0} still has open child transactions")]
    OpenChildren(TransactionId),
    #[error("creator returned {got} objects for {expected} descriptions")]
    CreateMismatch { expected: usize, got: usize },
}

/// Callbacks driven by [`CacheManager::find_objects_and_execute`]
pub trait CacheExecutor {
    type Value: Clone + Send + Sync + 'static;
    type Error: From<CacheError>;

    /// Produce the objects for descriptions that were not cached, in order.
    /// `None` marks an object that does not exist; it is not cached.
    fn create(
        &mut self,
        missing: &[CacheDescription],
    ) -> Result<Vec<Option<Self::Value>>, Self::Error>;

    /// Receive a copy of an object that was already cached
    fn exists(
        &mut self,
        description: &CacheDescription,
        value: Self::Value,
    ) -> Result<(), Self::Error>;

    /// Runs once, after every description was resolved
    fn execute(&mut self) -> Result<(), Self::Error>;
}

/// An open cache section
#[derive(Debug)]
#[must_use = "a cache section must be left with CacheManager::leave_cache"]
pub struct CacheHandle {
    transaction: Option<TransactionId>,
    descriptions: Vec<CacheDescription>,
    invalidate: BTreeSet<String>,
    locks: HeldLocks,
}

impl CacheHandle {
    pub fn transaction(&self) -> Option<&TransactionId> {
        self.transaction.as_ref()
    }

    pub fn descriptions(&self) -> &[CacheDescription] {
        &self.descriptions
    }
}

/// An open create section inside a cache section
#[derive(Debug)]
#[must_use = "a create section must be left with CacheManager::leave_create_section"]
pub struct CreateHandle {
    sections: Vec<SectionKey>,
    /// Sequence number drawn on entry; objects saved through this handle
    /// are stale if any of their keys is invalidated after it
    started: u64,
}

/// Lock set taken by one cache section
#[derive(Debug, Default)]
struct HeldLocks {
    read: Vec<String>,
    write: Vec<String>,
}

#[derive(Debug, Default)]
struct Transaction {
    parent: Option<TransactionId>,
    objects: HashMap<ObjectKey, Entry>,
    invalidated: BTreeSet<String>,
    /// Lock sets of every section left inside this transaction, oldest first
    held: Vec<HeldLocks>,
}

#[derive(Debug, Default)]
struct CacheState {
    store: ObjectStore,
    transactions: HashMap<TransactionId, Transaction>,
}

/// Process-wide object cache
///
/// Cache sections and transactions are bound to the thread that opened
/// them, since they hold locks from the shared [`LockManager`].
pub struct CacheManager {
    locks: Arc<LockManager>,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager").finish_non_exhaustive()
    }
}

impl CacheManager {
    pub fn new(locks: Arc<LockManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            locks,
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // === Single-call API ===

    /// Resolve every description through `executor`, then run its
    /// finalization and apply `invalidate`
    ///
    /// Objects created before a failure stay cached. On failure neither
    /// `execute` nor the invalidation happens.
    pub fn find_objects_and_execute<E: CacheExecutor>(
        &self,
        descriptions: &[CacheDescription],
        invalidate: &[String],
        executor: &mut E,
        transaction: Option<&TransactionId>,
    ) -> Result<(), E::Error> {
        let handle = self.enter_cache(descriptions, invalidate, transaction)?;
        let outcome = self.run_section(&handle, executor);
        let left = self.leave_cache(handle);
        outcome?;
        left?;
        Ok(())
    }

    fn run_section<E: CacheExecutor>(
        &self,
        handle: &CacheHandle,
        executor: &mut E,
    ) -> Result<(), E::Error> {
        let create = self.enter_create_section(handle);
        let resolved = self.resolve(handle, &create, executor);
        let left = self.leave_create_section(create);
        resolved?;
        left?;
        executor.execute()?;
        self.invalidate_keys(handle)?;
        Ok(())
    }

    fn resolve<E: CacheExecutor>(
        &self,
        handle: &CacheHandle,
        create: &CreateHandle,
        executor: &mut E,
    ) -> Result<(), E::Error> {
        let mut missing = Vec::new();
        for description in &handle.descriptions {
            match self.lookup_object::<E::Value>(handle, description)? {
                Some(value) => executor.exists(description, value)?,
                None => missing.push(description.clone()),
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let created = executor.create(&missing)?;
        if created.len() != missing.len() {
            return Err(CacheError::CreateMismatch {
                expected: missing.len(),
                got: created.len(),
            }
            .into());
        }
        for (description, value) in missing.iter().zip(created) {
            if let Some(value) = value {
                self.save_object(handle, create, description, value)?;
            }
        }
        Ok(())
    }

    // === Step-wise API ===

    /// Open a cache section
    ///
    /// Takes read locks on the invalidation keys of `descriptions` and write
    /// locks on `invalidate`. Inside a transaction the locks are handed to
    /// the transaction by [`leave_cache`](Self::leave_cache) and released
    /// when it ends.
    pub fn enter_cache(
        &self,
        descriptions: &[CacheDescription],
        invalidate: &[String],
        transaction: Option<&TransactionId>,
    ) -> Result<CacheHandle, CacheError> {
        if let Some(id) = transaction {
            if !self.lock().transactions.contains_key(id) {
                return Err(CacheError::UnknownTransaction(id.clone()));
            }
        }

        let invalidate: BTreeSet<String> = invalidate.iter().cloned().collect();
        let read: BTreeSet<String> = descriptions
            .iter()
            .filter_map(CacheDescription::invalidation_keys)
            .flatten()
            .filter(|key| !invalidate.contains(*key))
            .map(|key| lock_name(key))
            .collect();
        let locks = HeldLocks {
            read: read.into_iter().collect(),
            write: invalidate.iter().map(|key| lock_name(key)).collect(),
        };

        self.locks.enter_locks(&locks.read, &[], &locks.write);
        tracing::debug!(
            objects = descriptions.len(),
            invalidate = invalidate.len(),
            transaction = ?transaction.map(|t| &t.0),
            "entered cache section"
        );
        Ok(CacheHandle {
            transaction: transaction.cloned(),
            descriptions: descriptions.to_vec(),
            invalidate,
            locks,
        })
    }

    /// Serialize creation of the section's cacheable objects
    pub fn enter_create_section(&self, handle: &CacheHandle) -> CreateHandle {
        let sections: Vec<SectionKey> = handle
            .descriptions
            .iter()
            .filter(|d| d.is_cacheable())
            .map(CacheDescription::section_key)
            .collect();
        self.locks.enter_critical_sections(&sections, LockMode::Write);
        let started = self.lock().store.next_seq();
        CreateHandle { sections, started }
    }

    /// Copy of the cached object, if any
    ///
    /// Walks the transaction chain innermost first and stops at a
    /// transaction that invalidated one of the object's keys. A hit in the
    /// committed cache moves the object's expiration to the one
    /// `description` carries.
    pub fn lookup_object<V: Clone + 'static>(
        &self,
        handle: &CacheHandle,
        description: &CacheDescription,
    ) -> Result<Option<V>, CacheError> {
        let Some(keys) = description.invalidation_keys() else {
            return Ok(None);
        };
        let now = self.clock.now();
        let mut state = self.lock();

        let mut current = handle.transaction.clone();
        while let Some(id) = current {
            let txn = state
                .transactions
                .get(&id)
                .ok_or_else(|| CacheError::UnknownTransaction(id.clone()))?;
            if let Some(entry) = txn.objects.get(description.key()) {
                return Ok(copy_out(&entry.value, description.key()));
            }
            if !txn.invalidated.is_disjoint(keys) {
                return Ok(None);
            }
            current = txn.parent.clone();
        }

        let found = state.store.get(description.key(), now);
        if found.is_some() {
            if let Some(at) = description.expiration_time(now) {
                state.store.set_expiration(description.key(), at);
            }
        }
        Ok(found.and_then(|value| copy_out(&value, description.key())))
    }

    /// Cache a freshly created object
    ///
    /// Uncacheable descriptions are ignored. Outside a transaction an object
    /// whose keys were invalidated after the create section opened is
    /// dropped instead of stored.
    pub fn save_object<V: Clone + Send + Sync + 'static>(
        &self,
        handle: &CacheHandle,
        create: &CreateHandle,
        description: &CacheDescription,
        value: V,
    ) -> Result<(), CacheError> {
        let Some(keys) = description.invalidation_keys() else {
            return Ok(());
        };
        let entry = Entry {
            value: Arc::new(value),
            keys: keys.clone(),
            created: create.started,
            expires_at: description.expiration_time(self.clock.now()),
            class: description.class().cloned(),
        };

        let mut state = self.lock();
        match &handle.transaction {
            Some(id) => {
                let txn = state
                    .transactions
                    .get_mut(id)
                    .ok_or_else(|| CacheError::UnknownTransaction(id.clone()))?;
                txn.objects.insert(description.key().clone(), entry);
            }
            None => {
                if !state.store.insert(description.key().clone(), entry) {
                    tracing::debug!(object = %description.key(), "discarding object invalidated during creation");
                }
            }
        }
        Ok(())
    }

    pub fn leave_create_section(&self, create: CreateHandle) -> Result<(), CacheError> {
        self.locks
            .leave_critical_sections(&create.sections, LockMode::Write)?;
        Ok(())
    }

    /// Apply the section's invalidation keys
    ///
    /// Inside a transaction they are recorded and applied at top-level
    /// commit; objects the transaction itself cached under them are dropped
    /// now.
    pub fn invalidate_keys(&self, handle: &CacheHandle) -> Result<(), CacheError> {
        if handle.invalidate.is_empty() {
            return Ok(());
        }
        let mut state = self.lock();
        match &handle.transaction {
            Some(id) => {
                let txn = state
                    .transactions
                    .get_mut(id)
                    .ok_or_else(|| CacheError::UnknownTransaction(id.clone()))?;
                txn.objects
                    .retain(|_, entry| entry.keys.is_disjoint(&handle.invalidate));
                txn.invalidated.extend(handle.invalidate.iter().cloned());
            }
            None => {
                let dropped = state.store.invalidate(&handle.invalidate);
                tracing::debug!(keys = ?handle.invalidate, dropped, "invalidated cache keys");
            }
        }
        Ok(())
    }

    /// Close a cache section
    pub fn leave_cache(&self, handle: CacheHandle) -> Result<(), CacheError> {
        let CacheHandle {
            transaction, locks, ..
        } = handle;
        if let Some(id) = transaction {
            let mut state = self.lock();
            match state.transactions.get_mut(&id) {
                Some(txn) => {
                    txn.held.push(locks);
                    return Ok(());
                }
                None => {
                    tracing::warn!(transaction = %id, "leaving cache section of a finished transaction");
                }
            }
        }
        self.locks.leave_locks(&locks.read, &[], &locks.write)?;
        Ok(())
    }

    // === Transactions ===

    pub fn start_transaction(
        &self,
        id: TransactionId,
        parent: Option<&TransactionId>,
    ) -> Result<(), CacheError> {
        let mut state = self.lock();
        if state.transactions.contains_key(&id) {
            return Err(CacheError::DuplicateTransaction(id));
        }
        if let Some(parent) = parent {
            if !state.transactions.contains_key(parent) {
                return Err(CacheError::UnknownTransaction(parent.clone()));
            }
        }
        tracing::trace!(transaction = %id, "cache transaction started");
        state.transactions.insert(
            id,
            Transaction {
                parent: parent.cloned(),
                ..Transaction::default()
            },
        );
        Ok(())
    }

    /// Commit a transaction
    ///
    /// A child folds its objects, invalidations and locks into its parent.
    /// A top-level transaction applies its invalidations to the shared
    /// cache, publishes its objects and releases every lock it collected.
    pub fn commit_transaction(&self, id: &TransactionId) -> Result<(), CacheError> {
        let released = {
            let mut state = self.lock();
            let txn = take_transaction(&mut state, id)?;
            match &txn.parent {
                Some(parent_id) => {
                    let parent = state
                        .transactions
                        .get_mut(parent_id)
                        .ok_or_else(|| CacheError::UnknownTransaction(parent_id.clone()))?;
                    parent
                        .objects
                        .retain(|_, entry| entry.keys.is_disjoint(&txn.invalidated));
                    parent.invalidated.extend(txn.invalidated);
                    parent.objects.extend(txn.objects);
                    parent.held.extend(txn.held);
                    Vec::new()
                }
                None => {
                    let dropped = state.store.invalidate(&txn.invalidated);
                    let created = state.store.next_seq();
                    let published = txn.objects.len();
                    for (key, mut entry) in txn.objects {
                        entry.created = created;
                        state.store.insert(key, entry);
                    }
                    tracing::debug!(transaction = %id, dropped, published, "cache transaction committed");
                    txn.held
                }
            }
        };
        self.release(released)
    }

    /// Discard everything a transaction cached or invalidated and release
    /// its locks
    pub fn rollback_transaction(&self, id: &TransactionId) -> Result<(), CacheError> {
        let txn = {
            let mut state = self.lock();
            take_transaction(&mut state, id)?
        };
        tracing::debug!(
            transaction = %id,
            discarded = txn.objects.len(),
            "cache transaction rolled back"
        );
        self.release(txn.held)
    }

    fn release(&self, held: Vec<HeldLocks>) -> Result<(), CacheError> {
        let mut first_error = None;
        for locks in held.into_iter().rev() {
            if let Err(e) = self.locks.leave_locks(&locks.read, &[], &locks.write) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    // === Maintenance ===

    /// Evict every object whose expiration is at or before `now`
    pub fn expire_objects(&self, now: Instant) -> usize {
        let expired = self.lock().store.expire(now);
        if expired > 0 {
            tracing::debug!(expired, "expired cached objects");
        }
        expired
    }

    /// Whether an object is in the shared cache
    pub fn is_cached(&self, key: &ObjectKey) -> bool {
        self.lock().store.contains(key)
    }

    /// Number of objects in the shared cache
    pub fn cached_count(&self) -> usize {
        self.lock().store.len()
    }
}

fn take_transaction(state: &mut CacheState, id: &TransactionId) -> Result<Transaction, CacheError> {
    if state
        .transactions
        .values()
        .any(|t| t.parent.as_ref() == Some(id))
    {
        return Err(CacheError::OpenChildren(id.clone()));
    }
    state
        .transactions
        .remove(id)
        .ok_or_else(|| CacheError::UnknownTransaction(id.clone()))
}

fn copy_out<V: Clone + 'static>(value: &Value, key: &ObjectKey) -> Option<V> {
    match value.downcast_ref::<V>() {
        Some(v) => Some(v.clone()),
        None => {
            tracing::warn!(object = %key, "cached object has an unexpected type");
            None
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
