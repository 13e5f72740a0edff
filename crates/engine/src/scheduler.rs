// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner of the scheduler's background threads

use crate::error::SchedulerError;
use crate::policy::ProcessExit;
use crate::reset::ResetManager;
use crate::signal::StopSignal;
use crate::stuffer::{Stuffer, StufferConfig};
use crate::sweeper::Sweeper;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use trawl_core::{BinTracker, CacheManager, Clock, DocumentQueue, JobLoader, JobStore, LifecycleKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub max_queue_multiplier: usize,
    pub full_queue_poll: Duration,
    pub idle_backoff: Duration,
    pub reset_cooldown: Duration,
    pub expire_sweep_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            max_queue_multiplier: 3,
            full_queue_poll: Duration::from_millis(100),
            idle_backoff: Duration::from_secs(1),
            reset_cooldown: Duration::from_secs(10),
            expire_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl SchedulerConfig {
    pub fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(self.max_queue_multiplier).max(1)
    }

    fn stuffer(&self, kind: LifecycleKind) -> StufferConfig {
        StufferConfig {
            kind,
            workers: self.workers,
            full_queue_poll: self.full_queue_poll,
            idle_backoff: self.idle_backoff,
            reset_cooldown: self.reset_cooldown,
        }
    }
}

/// Collaborators the scheduler threads work against
#[derive(Clone)]
pub struct SchedulerDeps {
    pub store: Arc<dyn JobStore>,
    pub loader: Arc<dyn JobLoader>,
    pub cache: Arc<CacheManager>,
    pub clock: Arc<dyn Clock>,
    pub exit: Arc<dyn ProcessExit>,
}

/// Running stuffers, one per lifecycle kind, plus the cache sweeper
pub struct Scheduler {
    queues: BTreeMap<LifecycleKind, Arc<DocumentQueue>>,
    tracker: Arc<BinTracker>,
    resets: Arc<ResetManager>,
    stop: StopSignal,
    threads: Vec<(String, JoinHandle<()>)>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queues", &self.queues.keys().collect::<Vec<_>>())
            .field("threads", &self.threads.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn start(config: &SchedulerConfig, deps: SchedulerDeps) -> Result<Self, SchedulerError> {
        if config.workers == 0 {
            return Err(SchedulerError::Config("workers must be at least 1".to_string()));
        }

        let resets = Arc::new(ResetManager::new(Arc::clone(&deps.store)));
        let tracker = Arc::new(BinTracker::new());
        resets.register_tracker(Arc::clone(&tracker));

        let mut scheduler = Self {
            queues: BTreeMap::new(),
            tracker,
            resets,
            stop: StopSignal::new(),
            threads: Vec::new(),
        };

        for kind in LifecycleKind::ALL {
            let queue = Arc::new(DocumentQueue::new(kind.name(), config.queue_capacity()));
            scheduler.resets.register_queue(kind, Arc::clone(&queue));
            scheduler.queues.insert(kind, Arc::clone(&queue));

            let stuffer = Stuffer::new(
                config.stuffer(kind),
                queue,
                Arc::clone(&deps.store),
                Arc::clone(&deps.loader),
                Arc::clone(&scheduler.resets),
                Arc::clone(&deps.exit),
                scheduler.stop.clone(),
            );
            let name = format!("{kind}-stuffer");
            let handle = stuffer.spawn().map_err(|source| SchedulerError::Spawn {
                thread: name.clone(),
                source,
            });
            scheduler.track(name, handle)?;
        }

        let sweeper = Sweeper::new(
            deps.cache,
            deps.clock,
            config.expire_sweep_interval,
            scheduler.stop.clone(),
        );
        let handle = sweeper.spawn().map_err(|source| SchedulerError::Spawn {
            thread: "cache-sweeper".to_string(),
            source,
        });
        scheduler.track("cache-sweeper".to_string(), handle)?;

        tracing::info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity(),
            "scheduler started"
        );
        Ok(scheduler)
    }

    /// Keep a spawned thread, or stop the ones already running
    fn track(
        &mut self,
        name: String,
        handle: Result<JoinHandle<()>, SchedulerError>,
    ) -> Result<(), SchedulerError> {
        match handle {
            Ok(handle) => {
                self.threads.push((name, handle));
                Ok(())
            }
            Err(e) => {
                self.stop_threads();
                Err(e)
            }
        }
    }

    /// Queue the embedding worker pool drains for `kind`
    pub fn queue(&self, kind: LifecycleKind) -> Option<Arc<DocumentQueue>> {
        self.queues.get(&kind).cloned()
    }

    /// Rating context workers report their active bins to
    pub fn tracker(&self) -> Arc<BinTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn resets(&self) -> Arc<ResetManager> {
        Arc::clone(&self.resets)
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Stop every thread, wake queue consumers and wait for the threads
    pub fn shutdown(mut self) {
        self.stop_threads();
        tracing::info!("scheduler stopped");
    }

    fn stop_threads(&mut self) {
        self.stop.stop();
        for queue in self.queues.values() {
            queue.reset();
        }
        for (name, handle) in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::error!(thread = %name, "thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.stop_threads();
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
