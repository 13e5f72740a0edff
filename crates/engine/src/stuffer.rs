// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stuffer threads
//!
//! A stuffer moves documents of one lifecycle kind from the job store to
//! that kind's queue. Each pass fetches at most one in-clause worth of
//! documents, marking them in flight as it fetches, and queues one batch
//! per job. The queue's fill level throttles the loop, and a pass never
//! fetches more documents than the queue has free slots.

use crate::error::StufferError;
use crate::policy::{classify, FailureAction, ProcessExit, EXIT_RESOURCES, EXIT_SETUP};
use crate::reset::{ResetManager, ResetParticipant};
use crate::signal::StopSignal;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use trawl_core::{
    DocumentBatch, DocumentDescriptor, DocumentQueue, JobId, JobLoader, JobStore, LifecycleKind,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StufferConfig {
    pub kind: LifecycleKind,
    /// Workers draining the queue; the queue counts as empty enough while
    /// it holds no more batches than this
    pub workers: usize,
    pub full_queue_poll: Duration,
    pub idle_backoff: Duration,
    pub reset_cooldown: Duration,
}

impl StufferConfig {
    pub fn new(kind: LifecycleKind, workers: usize) -> Self {
        Self {
            kind,
            workers,
            full_queue_poll: Duration::from_millis(100),
            idle_backoff: Duration::from_secs(1),
            reset_cooldown: Duration::from_secs(10),
        }
    }
}

/// Outcome of one successful stuffer pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Stop was requested
    Stopped,
    /// The queue was too full to take more work
    Throttled,
    /// Nothing was pending
    Idle,
    /// Batches were offered to the queue
    Queued { batches: usize, documents: usize },
}

pub struct Stuffer {
    config: StufferConfig,
    queue: Arc<DocumentQueue>,
    store: Arc<dyn JobStore>,
    loader: Arc<dyn JobLoader>,
    resets: Arc<ResetManager>,
    exit: Arc<dyn ProcessExit>,
    stop: StopSignal,
}

impl std::fmt::Debug for Stuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stuffer")
            .field("config", &self.config)
            .field("queue", &self.queue.name())
            .finish_non_exhaustive()
    }
}

impl Stuffer {
    pub fn new(
        config: StufferConfig,
        queue: Arc<DocumentQueue>,
        store: Arc<dyn JobStore>,
        loader: Arc<dyn JobLoader>,
        resets: Arc<ResetManager>,
        exit: Arc<dyn ProcessExit>,
        stop: StopSignal,
    ) -> Self {
        Self {
            config,
            queue,
            store,
            loader,
            resets,
            exit,
            stop,
        }
    }

    pub fn kind(&self) -> LifecycleKind {
        self.config.kind
    }

    /// Run the loop on a named thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        let participant = self.resets.register();
        thread::Builder::new()
            .name(format!("{}-stuffer", self.config.kind))
            .spawn(move || self.run(participant))
    }

    /// Loop until stopped, interrupted or terminated by the failure policy
    pub fn run(&self, participant: ResetParticipant) {
        let kind = self.config.kind;
        tracing::info!(%kind, "stuffer started");
        loop {
            let pause = match self.run_once(&participant) {
                Ok(Pass::Stopped) => break,
                Ok(Pass::Throttled) => self.config.full_queue_poll,
                Ok(Pass::Idle) => self.config.idle_backoff,
                Ok(Pass::Queued { .. }) => {
                    thread::yield_now();
                    continue;
                }
                Err(e) => match self.handle_failure(&e) {
                    Some(pause) => pause,
                    None => break,
                },
            };
            if !self.stop.sleep(pause) {
                break;
            }
        }
        tracing::info!(%kind, "stuffer stopped");
    }

    /// Apply the failure policy; `None` ends the loop
    fn handle_failure(&self, error: &StufferError) -> Option<Duration> {
        let kind = self.config.kind;
        match classify(error) {
            FailureAction::Exit => None,
            FailureAction::ResetAndCooldown => {
                tracing::warn!(%kind, error = %error, "store connection lost, resetting");
                self.resets.note_event();
                Some(self.config.reset_cooldown)
            }
            FailureAction::Fatal => {
                tracing::error!(%kind, error = %error, "setup error, shutting down");
                self.exit.exit(EXIT_SETUP);
                None
            }
            FailureAction::Abort => {
                tracing::error!(%kind, error = %error, "out of resources, aborting");
                self.exit.exit(EXIT_RESOURCES);
                None
            }
            FailureAction::LogAndContinue => {
                tracing::error!(%kind, error = %error, "stuffer pass failed");
                Some(self.config.full_queue_poll)
            }
        }
    }

    /// One pass of the loop, without failure handling or pauses
    pub fn run_once(&self, participant: &ResetParticipant) -> Result<Pass, StufferError> {
        if self.stop.is_stopped() || !participant.wait_for_reset(&self.stop) {
            return Ok(Pass::Stopped);
        }
        if !self.queue.check_if_empty(self.config.workers) {
            return Ok(Pass::Throttled);
        }
        // Every fetched document can become its own batch
        let room = self.queue.capacity().saturating_sub(self.queue.len());
        if room == 0 {
            return Ok(Pass::Throttled);
        }

        let kind = self.config.kind;
        let limit = self.store.max_in_clause().min(room);
        let fetched = self.store.fetch_and_mark(kind, limit)?;
        if fetched.is_empty() {
            return Ok(Pass::Idle);
        }

        let documents = fetched.len();
        let mut batches = 0;
        for (job_id, docs) in partition_by_job(fetched) {
            let Some(job) = self.loader.load_job(job_id)? else {
                tracing::warn!(%kind, job = %job_id, count = docs.len(), "job vanished, skipping its documents");
                continue;
            };
            let batch = DocumentBatch::new(kind, Arc::new(job), docs)?;
            if self.queue.add_document(batch) {
                batches += 1;
            }
        }
        tracing::debug!(%kind, batches, documents, "queued documents");
        Ok(Pass::Queued { batches, documents })
    }
}

/// Group documents by job, keeping the order in which jobs first appear
fn partition_by_job(documents: Vec<DocumentDescriptor>) -> Vec<(JobId, Vec<DocumentDescriptor>)> {
    let mut index: HashMap<JobId, usize> = HashMap::new();
    let mut groups: Vec<(JobId, Vec<DocumentDescriptor>)> = Vec::new();
    for doc in documents {
        match index.get(&doc.job_id) {
            Some(&at) => groups[at].1.push(doc),
            None => {
                index.insert(doc.job_id, groups.len());
                groups.push((doc.job_id, vec![doc]));
            }
        }
    }
    groups
}

#[cfg(test)]
#[path = "stuffer_tests.rs"]
mod tests;
