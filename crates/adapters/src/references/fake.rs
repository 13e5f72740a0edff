// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake reference checker for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::ReferenceChecker;
use crate::{AdapterError, ConnectionKind};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
    in_use: BTreeSet<(ConnectionKind, String)>,
    checks: Vec<(ConnectionKind, String)>,
    failure: Option<AdapterError>,
}

/// Reference checker whose answers the test controls
///
/// Clones share state, so a test can keep one handle while the registry
/// holds another.
#[derive(Clone, Debug, Default)]
pub struct FakeReferences {
    state: Arc<Mutex<State>>,
}

impl FakeReferences {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark `name` as referenced by a live job
    pub fn reference(&self, kind: ConnectionKind, name: &str) {
        self.lock().in_use.insert((kind, name.to_string()));
    }

    pub fn unreference(&self, kind: ConnectionKind, name: &str) {
        self.lock().in_use.remove(&(kind, name.to_string()));
    }

    /// Make every check fail with `error` until cleared
    pub fn fail_with(&self, error: Option<AdapterError>) {
        self.lock().failure = error;
    }

    /// Every check made so far
    pub fn checks(&self) -> Vec<(ConnectionKind, String)> {
        self.lock().checks.clone()
    }
}

impl ReferenceChecker for FakeReferences {
    fn is_connection_in_use(&self, kind: ConnectionKind, name: &str) -> Result<bool, AdapterError> {
        let mut state = self.lock();
        state.checks.push((kind, name.to_string()));
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        Ok(state.in_use.contains(&(kind, name.to_string())))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
