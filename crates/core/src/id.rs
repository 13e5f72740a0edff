// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction identifiers
//!
//! Store transactions and their cache shadows are keyed by a
//! [`TransactionId`] minted from an [`IdGen`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one store transaction and the cache state scoped to it
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints transaction identifiers
pub trait IdGen: Send + Sync {
    fn next(&self) -> TransactionId;
}

/// UUID-based generator for production use
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> TransactionId {
        TransactionId(uuid::Uuid::new_v4().to_string())
    }
}

/// Sequential generator for tests
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("txn")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> TransactionId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        TransactionId(format!("{}-{}", self.prefix, n))
    }
}
