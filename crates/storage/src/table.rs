// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection table interface

use crate::wal::WalError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column names of a connection table
pub mod columns {
    pub const NAME: &str = "connectionname";
    pub const DESCRIPTION: &str = "description";
    pub const CLASS_NAME: &str = "classname";
    pub const MAX_COUNT: &str = "maxcount";
    pub const CONFIG: &str = "configxml";
}

/// One persisted connection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub name: String,
    pub description: Option<String>,
    pub class_name: String,
    pub max_count: i32,
    /// Opaque serialized configuration
    pub config: String,
}

/// Index over one or more columns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

impl IndexDescription {
    pub fn new(name: impl Into<String>, unique: bool, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            unique,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Same shape, ignoring the name
    pub fn matches(&self, other: &IndexDescription) -> bool {
        self.unique == other.unique && self.columns == other.columns
    }

    /// Primary-key indexes belong to the table itself and are never dropped
    pub fn is_primary(&self) -> bool {
        self.name.ends_with("_pkey")
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Lock contention made the store give up on the transaction
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),
    #[error("store connection lost: {0}")]
    ConnectionLost(String),
    #[error("table {0} is not installed")]
    TableMissing(String),
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),
    #[error("no row '{0}'")]
    RowMissing(String),
    #[error("{count} keys exceed the in-clause limit of {limit}")]
    TooManyKeys { count: usize, limit: usize },
    #[error("index {0} not found")]
    IndexMissing(String),
    #[error(transparent)]
    Wal(#[from] WalError),
}

impl StoreError {
    /// Deadlock-class failure: the whole operation may be retried
    pub fn is_transaction_abort(&self) -> bool {
        matches!(self, StoreError::TransactionAborted(_))
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, StoreError::ConnectionLost(_))
    }
}

/// An open read-write transaction
///
/// Dropping an uncommitted transaction rolls it back.
pub trait TableTransaction {
    /// Locking read: holds the row (present or not) until the transaction ends
    fn select_for_update(&mut self, name: &str) -> Result<Option<ConnectionRow>, StoreError>;

    fn insert(&mut self, row: ConnectionRow) -> Result<(), StoreError>;

    fn update(&mut self, row: ConnectionRow) -> Result<(), StoreError>;

    /// Returns whether a row was removed
    fn delete(&mut self, name: &str) -> Result<bool, StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    fn rollback(self: Box<Self>);
}

/// A persisted connection table
pub trait ConnectionTable: Send + Sync {
    fn table_name(&self) -> &str;

    /// Largest key list one [`fetch`](Self::fetch) accepts
    fn max_in_clause(&self) -> usize;

    /// Committed connection names in no particular order
    fn list_names(&self) -> Result<Vec<String>, StoreError>;

    /// Committed rows for `names`; missing names are skipped
    fn fetch(&self, names: &[String]) -> Result<Vec<ConnectionRow>, StoreError>;

    /// Names of connections using `class_name`
    fn find_by_class(&self, class_name: &str) -> Result<Vec<String>, StoreError>;

    fn begin(&self) -> Result<Box<dyn TableTransaction + '_>, StoreError>;

    // === Schema ===

    fn is_installed(&self) -> bool;

    /// Create the table with its primary key index
    fn create_table(&self) -> Result<(), StoreError>;

    fn drop_table(&self) -> Result<(), StoreError>;

    fn indexes(&self) -> Result<Vec<IndexDescription>, StoreError>;

    fn add_index(&self, index: IndexDescription) -> Result<(), StoreError>;

    fn drop_index(&self, name: &str) -> Result<(), StoreError>;
}
