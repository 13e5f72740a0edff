// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reset coordination across the scheduler threads
//!
//! A reset discards queued work after the store connection was lost or the
//! topology changed. [`ResetManager::note_event`] starts one: queues stop
//! accepting batches and wake their consumers. Every registered participant
//! then parks in [`ResetParticipant::wait_for_reset`]; the last one to
//! arrive performs the reset, which clears the queues, returns in-flight
//! documents to pending and bumps the epoch.

use crate::signal::StopSignal;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use trawl_core::{BinTracker, DocumentQueue, JobStore, LifecycleKind};

const WAIT_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct ResetState {
    participants: usize,
    waiting: usize,
    pending: bool,
    epoch: u64,
}

pub struct ResetManager {
    store: Arc<dyn JobStore>,
    queues: Mutex<Vec<(LifecycleKind, Arc<DocumentQueue>)>>,
    trackers: Mutex<Vec<Arc<BinTracker>>>,
    state: Mutex<ResetState>,
    done: Condvar,
}

impl std::fmt::Debug for ResetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ResetManager")
            .field("epoch", &state.epoch)
            .field("pending", &state.pending)
            .field("participants", &state.participants)
            .finish()
    }
}

impl ResetManager {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            queues: Mutex::new(Vec::new()),
            trackers: Mutex::new(Vec::new()),
            state: Mutex::new(ResetState::default()),
            done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResetState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue whose work a reset discards; its in-flight documents of `kind`
    /// go back to pending
    pub fn register_queue(&self, kind: LifecycleKind, queue: Arc<DocumentQueue>) {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((kind, queue));
    }

    pub fn register_tracker(&self, tracker: Arc<BinTracker>) {
        self.trackers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tracker);
    }

    /// Join the set of threads a reset waits for
    pub fn register(self: &Arc<Self>) -> ResetParticipant {
        self.lock().participants += 1;
        ResetParticipant {
            manager: Arc::clone(self),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub fn is_resetting(&self) -> bool {
        self.lock().pending
    }

    /// Begin a reset
    pub fn note_event(&self) {
        let mut state = self.lock();
        if !state.pending {
            tracing::warn!(epoch = state.epoch, "reset requested");
            state.pending = true;
        }
        for (_, queue) in self.queues.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            queue.reset();
        }
        for tracker in self.trackers.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            tracker.begin_reset();
        }
        if state.participants == 0 {
            self.finish(&mut state);
        }
    }

    /// Perform a pending reset now, without waiting for participants
    pub fn complete_reset(&self) {
        let mut state = self.lock();
        if state.pending {
            self.finish(&mut state);
        }
    }

    fn finish(&self, state: &mut ResetState) {
        for (kind, queue) in self.queues.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            queue.clear();
            match self.store.reset_in_flight(*kind) {
                Ok(count) => tracing::info!(%kind, count, "returned in-flight documents"),
                Err(e) => tracing::error!(%kind, error = %e, "failed to return in-flight documents"),
            }
        }
        for tracker in self.trackers.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            tracker.end_reset();
        }
        state.pending = false;
        state.waiting = 0;
        state.epoch += 1;
        tracing::info!(epoch = state.epoch, "reset complete");
        self.done.notify_all();
    }
}

/// A thread taking part in resets; dropping it deregisters the thread
#[derive(Debug)]
pub struct ResetParticipant {
    manager: Arc<ResetManager>,
}

impl ResetParticipant {
    /// Block while a reset is pending; returns false if `stop` fired first
    pub fn wait_for_reset(&self, stop: &StopSignal) -> bool {
        let manager = &self.manager;
        let mut state = manager.lock();
        if !state.pending {
            return true;
        }
        let epoch = state.epoch;
        state.waiting += 1;
        if state.waiting >= state.participants {
            manager.finish(&mut state);
            return true;
        }
        while state.epoch == epoch {
            if stop.is_stopped() {
                state.waiting -= 1;
                return false;
            }
            state = manager
                .done
                .wait_timeout(state, WAIT_SLICE)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        true
    }
}

impl Drop for ResetParticipant {
    fn drop(&mut self) {
        let manager = &self.manager;
        let mut state = manager.lock();
        state.participants = state.participants.saturating_sub(1);
        if state.pending && state.waiting > 0 && state.waiting >= state.participants {
            manager.finish(&mut state);
        }
    }
}

#[cfg(test)]
#[path = "reset_tests.rs"]
mod tests;
