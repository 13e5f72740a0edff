// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job reference checks guarding connection deletes

use crate::{AdapterError, ConnectionKind};
use std::sync::Arc;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeReferences;

/// Answers whether any live job references a connection
pub trait ReferenceChecker: Send + Sync {
    fn is_connection_in_use(&self, kind: ConnectionKind, name: &str) -> Result<bool, AdapterError>;
}

impl<T: ReferenceChecker + ?Sized> ReferenceChecker for Arc<T> {
    fn is_connection_in_use(&self, kind: ConnectionKind, name: &str) -> Result<bool, AdapterError> {
        (**self).is_connection_in_use(kind, name)
    }
}

/// Checker for deployments without a job manager: nothing is referenced
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReferences;

impl ReferenceChecker for NoReferences {
    fn is_connection_in_use(&self, _kind: ConnectionKind, _name: &str) -> Result<bool, AdapterError> {
        Ok(false)
    }
}
