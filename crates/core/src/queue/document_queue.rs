// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document queue
//!
//! A monitor over a plain vector. Dequeue scans every queued batch, so the
//! order of the vector is only insertion order and carries no priority.

use crate::document::DocumentBatch;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Scores a queued batch at dequeue time; higher is better
pub trait RatingContext {
    fn rate(&self, batch: &DocumentBatch) -> f64;
}

impl<F> RatingContext for F
where
    F: Fn(&DocumentBatch) -> f64,
{
    fn rate(&self, batch: &DocumentBatch) -> f64 {
        self(batch)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    batches: Vec<DocumentBatch>,
    resetting: bool,
}

/// Queue of document batches shared by one stuffer and a worker pool
#[derive(Debug)]
pub struct DocumentQueue {
    name: String,
    capacity: usize,
    state: Mutex<QueueState>,
    available: Condvar,
}

impl DocumentQueue {
    /// Create a queue that reports full at `capacity` batches
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a batch and wake one waiting worker
    ///
    /// Returns false, dropping the batch, while a reset is in progress.
    pub fn add_document(&self, batch: DocumentBatch) -> bool {
        let mut state = self.lock();
        if state.resetting {
            tracing::debug!(queue = %self.name, job = %batch.job().id, "dropping batch during reset");
            return false;
        }
        state.batches.push(batch);
        drop(state);
        self.available.notify_one();
        true
    }

    /// Block until a batch is available, then remove the best-rated one
    ///
    /// Returns `None` only when a reset is signaled.
    pub fn get_document(&self, rating: &dyn RatingContext) -> Option<DocumentBatch> {
        let mut state = self.lock();
        loop {
            if state.resetting {
                return None;
            }
            if let Some(batch) = take_best(&mut state.batches, rating) {
                return Some(batch);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Like [`get_document`](Self::get_document) but gives up after `timeout`
    pub fn get_document_timeout(
        &self,
        rating: &dyn RatingContext,
        timeout: Duration,
    ) -> Option<DocumentBatch> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if state.resetting {
                return None;
            }
            if let Some(batch) = take_best(&mut state.batches, rating) {
                return Some(batch);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            state = self
                .available
                .wait_timeout(state, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Point-in-time check: true iff at most `low_water_mark` batches are queued
    pub fn check_if_empty(&self, low_water_mark: usize) -> bool {
        self.lock().batches.len() <= low_water_mark
    }

    /// Point-in-time check against the hard bound
    pub fn is_full(&self) -> bool {
        self.lock().batches.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().batches.is_empty()
    }

    pub fn is_resetting(&self) -> bool {
        self.lock().resetting
    }

    /// Enter reset: stop accepting batches and release every waiting worker
    pub fn reset(&self) {
        let mut state = self.lock();
        state.resetting = true;
        drop(state);
        tracing::debug!(queue = %self.name, "queue reset");
        self.available.notify_all();
    }

    /// Discard all queued batches and leave reset
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.batches.len();
        state.batches.clear();
        state.resetting = false;
        drop(state);
        tracing::debug!(queue = %self.name, dropped, "queue cleared");
    }
}

/// Remove the highest-rated batch; ties go to the earliest index
fn take_best(batches: &mut Vec<DocumentBatch>, rating: &dyn RatingContext) -> Option<DocumentBatch> {
    let mut best: Option<(usize, f64)> = None;
    for (index, batch) in batches.iter().enumerate() {
        let mut score = rating.rate(batch);
        if score.is_nan() {
            score = f64::NEG_INFINITY;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| batches.remove(index))
}

#[cfg(test)]
#[path = "document_queue_tests.rs"]
mod tests;
