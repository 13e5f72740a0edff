// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake change notifier for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::ChangeNotifier;
use crate::{AdapterError, ConnectionKind};
use std::sync::{Arc, Mutex};

/// Recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub kind: ConnectionKind,
    pub name: String,
}

/// Change notifier that records every call
#[derive(Clone, Debug, Default)]
pub struct FakeNotifier {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of notifications about `name`
    pub fn count_for(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.name == name)
            .count()
    }
}

impl ChangeNotifier for FakeNotifier {
    fn connection_changed(&self, kind: ConnectionKind, name: &str) -> Result<(), AdapterError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(NotifyCall {
                kind,
                name: name.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
