// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry error types

use thiserror::Error;
use trawl_adapters::{AdapterError, ConnectionKind};
use trawl_core::{CacheError, LockError};
use trawl_storage::StoreError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} connection '{name}' already exists")]
    AlreadyExists { kind: ConnectionKind, name: String },
    #[error("{kind} connection '{name}' no longer exists")]
    NoLongerExists { kind: ConnectionKind, name: String },
    #[error("{kind} connection '{name}' is still in use by a job")]
    InUse { kind: ConnectionKind, name: String },
    #[error("no such {kind} connection: '{name}'")]
    NotFound { kind: ConnectionKind, name: String },
    #[error("configuration of '{name}' is unreadable: {source}")]
    CorruptConfig {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} gave up after {attempts} aborted attempts: {last}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        last: String,
    },
    #[error("unknown {kind} connection configuration version: {version}")]
    UnsupportedVersion { kind: ConnectionKind, version: i32 },
    #[error("malformed configuration stream: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Collaborator(#[from] AdapterError),
}

impl RegistryError {
    /// The store aborted the transaction for lock contention
    pub fn is_transaction_abort(&self) -> bool {
        matches!(self, RegistryError::Store(e) if e.is_transaction_abort())
    }
}
