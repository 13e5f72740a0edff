// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment rating by connection bin activity

use super::document_queue::RatingContext;
use crate::document::DocumentBatch;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct BinState {
    active: HashMap<String, u32>,
    resetting: bool,
}

/// Counts batches in progress per connection bin
///
/// Batches whose bins are already busy rate lower, so workers spread over
/// connections instead of piling onto one. Counts are dropped during a
/// reset and updates are ignored until the reset ends.
#[derive(Debug, Default)]
pub struct BinTracker {
    state: Mutex<BinState>,
}

impl BinTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BinState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Note that a worker started on a batch touching `bins`
    pub fn begin_processing(&self, bins: &[String]) {
        let mut state = self.lock();
        if state.resetting {
            return;
        }
        for bin in bins {
            *state.active.entry(bin.clone()).or_insert(0) += 1;
        }
    }

    /// Note that a worker finished a batch touching `bins`
    pub fn end_processing(&self, bins: &[String]) {
        let mut state = self.lock();
        if state.resetting {
            return;
        }
        for bin in bins {
            if let Some(count) = state.active.get_mut(bin) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    state.active.remove(bin);
                }
            }
        }
    }

    pub fn begin_reset(&self) {
        let mut state = self.lock();
        state.resetting = true;
        state.active.clear();
    }

    pub fn end_reset(&self) {
        self.lock().resetting = false;
    }

    pub fn active(&self, bin: &str) -> u32 {
        self.lock().active.get(bin).copied().unwrap_or(0)
    }

    /// Mean of `-ln(1 + active)` over the bins; zero when there are none
    pub fn assignment_rating(&self, bins: &[String]) -> f64 {
        if bins.is_empty() {
            return 0.0;
        }
        let state = self.lock();
        let load: f64 = bins
            .iter()
            .map(|bin| f64::from(state.active.get(bin).copied().unwrap_or(0)).ln_1p())
            .sum();
        -load / bins.len() as f64
    }
}

impl RatingContext for BinTracker {
    fn rate(&self, batch: &DocumentBatch) -> f64 {
        self.assignment_rating(&batch.bins())
    }
}

#[cfg(test)]
#[path = "rating_tests.rs"]
mod tests;
