// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connection registry
//!
//! Every mutation runs under the kind's non-exclusive write lock, inside a
//! cache transaction paired with a store transaction. The cache
//! transaction holds write locks on the list key and the record key until
//! commit, so concurrent readers of either wait for the new state instead
//! of caching the old one. Reads of all connections take the kind's read
//! lock, which excludes writers of this kind but not each other.

use crate::error::RegistryError;
use crate::keys::KindKeys;
use crate::loader::{RecordLoader, SingleObject};
use crate::record::ConnectionRecord;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use trawl_adapters::{ChangeNotifier, ConnectionKind, ConnectorAuthority, ReferenceChecker};
use trawl_core::{CacheManager, IdGen, LockManager, LockMode, TransactionId};
use trawl_storage::{columns, ConnectionTable, IndexDescription, TableTransaction};

/// Process-wide coordination shared by every registry
#[derive(Clone)]
pub struct Coordination {
    pub locks: Arc<LockManager>,
    pub cache: Arc<CacheManager>,
    pub ids: Arc<dyn IdGen>,
}

/// External systems a registry consults
#[derive(Clone)]
pub struct Collaborators {
    pub authority: Arc<dyn ConnectorAuthority>,
    pub references: Arc<dyn ReferenceChecker>,
    pub notifier: Arc<dyn ChangeNotifier>,
}

#[derive(Clone, Debug, Default)]
pub struct RegistryOptions {
    pub retry: RetryPolicy,
    /// How long a cached record stays valid without being invalidated
    pub cache_lifetime: Option<Duration>,
    /// LRU bound on cached records of this kind
    pub max_cached: Option<usize>,
}

/// Registry of named connector configurations of one kind
pub struct ConnectionRegistry {
    kind: ConnectionKind,
    table: Arc<dyn ConnectionTable>,
    coordination: Coordination,
    collaborators: Collaborators,
    retry: RetryPolicy,
    keys: KindKeys,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("kind", &self.kind)
            .field("table", &self.table.table_name())
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    pub fn new(
        kind: ConnectionKind,
        table: Arc<dyn ConnectionTable>,
        coordination: Coordination,
        collaborators: Collaborators,
        options: RegistryOptions,
    ) -> Self {
        Self {
            kind,
            table,
            coordination,
            collaborators,
            keys: KindKeys::new(kind, options.cache_lifetime, options.max_cached),
            retry: options.retry,
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Column used to order and join on connection names
    pub fn connection_name_column(&self) -> &'static str {
        columns::NAME
    }

    // === Schema ===

    /// Create the table if needed and reconcile its indexes: keep one
    /// class-name index, drop every other non-primary index.
    pub fn install(&self) -> Result<(), RegistryError> {
        if !self.table.is_installed() {
            info!(kind = %self.kind, table = self.table.table_name(), "creating connection table");
            self.table.create_table()?;
        }

        let wanted = IndexDescription::new(
            format!("{}_{}_idx", self.table.table_name(), columns::CLASS_NAME),
            false,
            &[columns::CLASS_NAME],
        );
        let mut have_class_index = false;
        for index in self.table.indexes()? {
            if !have_class_index && index.matches(&wanted) {
                have_class_index = true;
            } else if !index.is_primary() {
                debug!(kind = %self.kind, index = %index.name, "dropping stray index");
                self.table.drop_index(&index.name)?;
            }
        }
        if !have_class_index {
            self.table.add_index(wanted)?;
        }
        Ok(())
    }

    pub fn deinstall(&self) -> Result<(), RegistryError> {
        if self.table.is_installed() {
            info!(kind = %self.kind, table = self.table.table_name(), "dropping connection table");
            self.table.drop_table()?;
        }
        Ok(())
    }

    // === Reads ===

    /// An unsaved record to fill in and pass to [`save`](Self::save)
    pub fn create(&self) -> ConnectionRecord {
        ConnectionRecord::default()
    }

    /// Every connection of this kind, ordered by name ignoring case
    pub fn get_all_connections(&self) -> Result<Vec<ConnectionRecord>, RegistryError> {
        let _lock = self.coordination.locks.guard(&self.keys.lock, LockMode::Read);
        let names = self.connection_names()?;
        Ok(self.load_multiple(&names)?.into_iter().flatten().collect())
    }

    fn connection_names(&self) -> Result<Vec<String>, RegistryError> {
        let mut executor = SingleObject::new(|| {
            let mut names = self.table.list_names()?;
            names.sort_by_cached_key(|name| name.to_lowercase());
            Ok(names)
        });
        self.coordination.cache.find_objects_and_execute(
            &[self.keys.names_description()],
            &[],
            &mut executor,
            None,
        )?;
        Ok(executor.into_value().unwrap_or_default())
    }

    pub fn load(&self, name: &str) -> Result<Option<ConnectionRecord>, RegistryError> {
        Ok(self
            .load_multiple(&[name.to_string()])?
            .into_iter()
            .next()
            .flatten())
    }

    /// Load records by name; the result is aligned with `names` and holds
    /// `None` where no connection exists.
    pub fn load_multiple(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<ConnectionRecord>>, RegistryError> {
        let mut out = Vec::with_capacity(names.len());
        for chunk in names.chunks(self.table.max_in_clause().max(1)) {
            let descriptions: Vec<_> =
                chunk.iter().map(|name| self.keys.record_description(name)).collect();
            let mut loader = RecordLoader::new(self.table.as_ref());
            self.coordination.cache.find_objects_and_execute(
                &descriptions,
                &[],
                &mut loader,
                None,
            )?;
            out.extend(chunk.iter().map(|name| loader.get(name)));
        }
        Ok(out)
    }

    /// Names of the connections using connector class `class_name`
    pub fn find_connections_for_connector(
        &self,
        class_name: &str,
    ) -> Result<Vec<String>, RegistryError> {
        let mut executor = SingleObject::new(|| {
            let mut names = self.table.find_by_class(class_name)?;
            names.sort();
            Ok(names)
        });
        self.coordination.cache.find_objects_and_execute(
            &[self.keys.by_class_description(class_name)],
            &[],
            &mut executor,
            None,
        )?;
        Ok(executor.into_value().unwrap_or_default())
    }

    /// Whether the connector class behind connection `name` is installed
    pub fn check_connector_exists(&self, name: &str) -> Result<bool, RegistryError> {
        let record = self.load(name)?.ok_or_else(|| RegistryError::NotFound {
            kind: self.kind,
            name: name.to_string(),
        })?;
        Ok(self
            .collaborators
            .authority
            .is_installed(self.kind, &record.class_name)?)
    }

    // === Writes ===

    /// Persist `record`; returns true when a row was inserted
    ///
    /// A new record whose name is taken fails with `AlreadyExists`; an
    /// existing record whose row is gone fails with `NoLongerExists`.
    /// Changing the stored configuration of an existing connection sends
    /// one change notification once the write is committed.
    pub fn save(&self, record: &ConnectionRecord) -> Result<bool, RegistryError> {
        let invalidate = [self.keys.list.clone(), self.keys.record(&record.name)];
        let row = record.to_row();

        let (created, changed) = self.retry.run("save", || {
            let _lock = self.coordination.locks.guard(&self.keys.lock, LockMode::NonExWrite);
            self.in_transaction(&invalidate, |txn| {
                match txn.select_for_update(&record.name)? {
                    Some(_) if record.is_new => Err(RegistryError::AlreadyExists {
                        kind: self.kind,
                        name: record.name.clone(),
                    }),
                    Some(old) => {
                        let changed = old.config != row.config;
                        txn.update(row.clone())?;
                        Ok((false, changed))
                    }
                    None if record.is_new => {
                        txn.insert(row.clone())?;
                        Ok((true, false))
                    }
                    None => Err(RegistryError::NoLongerExists {
                        kind: self.kind,
                        name: record.name.clone(),
                    }),
                }
            })
        })?;

        info!(kind = %self.kind, name = %record.name, created, changed, "connection saved");
        if changed {
            if let Err(e) = self.collaborators.notifier.connection_changed(self.kind, &record.name) {
                warn!(kind = %self.kind, name = %record.name, error = %e, "change notification failed");
            }
        }
        Ok(created)
    }

    /// Remove connection `name`; returns false when it did not exist
    ///
    /// Refused with `InUse` while any job references the connection.
    pub fn delete(&self, name: &str) -> Result<bool, RegistryError> {
        let invalidate = [self.keys.list.clone(), self.keys.record(name)];

        let deleted = self.retry.run("delete", || {
            let _lock = self.coordination.locks.guard(&self.keys.lock, LockMode::NonExWrite);
            self.in_transaction(&invalidate, |txn| {
                if self.collaborators.references.is_connection_in_use(self.kind, name)? {
                    return Err(RegistryError::InUse {
                        kind: self.kind,
                        name: name.to_string(),
                    });
                }
                Ok(txn.delete(name)?)
            })
        })?;

        if deleted {
            info!(kind = %self.kind, name, "connection deleted");
        }
        Ok(deleted)
    }

    /// Run `body` in a store transaction shadowed by a cache transaction
    /// that write-locks `invalidate` and invalidates it on commit.
    fn in_transaction<T>(
        &self,
        invalidate: &[String],
        body: impl FnOnce(&mut dyn TableTransaction) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let cache = &self.coordination.cache;
        let id = self.coordination.ids.next();
        cache.start_transaction(id.clone(), None)?;

        match self.write_rows(&id, invalidate, body) {
            Ok(value) => {
                cache.commit_transaction(&id)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = cache.rollback_transaction(&id) {
                    warn!(transaction = %id, error = %rollback, "cache rollback failed");
                }
                Err(e)
            }
        }
    }

    fn write_rows<T>(
        &self,
        id: &TransactionId,
        invalidate: &[String],
        body: impl FnOnce(&mut dyn TableTransaction) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let cache = &self.coordination.cache;
        let handle = cache.enter_cache(&[], invalidate, Some(id))?;
        let outcome = self.commit_rows(&handle, body);
        let left = cache.leave_cache(handle);
        let value = outcome?;
        left?;
        Ok(value)
    }

    fn commit_rows<T>(
        &self,
        handle: &trawl_core::CacheHandle,
        body: impl FnOnce(&mut dyn TableTransaction) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut txn = self.table.begin()?;
        let value = match body(txn.as_mut()) {
            Ok(value) => value,
            Err(e) => {
                txn.rollback();
                return Err(e);
            }
        };
        self.coordination.cache.invalidate_keys(handle)?;
        txn.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
