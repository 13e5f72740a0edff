// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Stuffers feeding a small simulated worker pool

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use trawl_core::{
    CacheManager, DocumentId, JobDescription, JobId, JobStoreError, LifecycleKind, LockManager,
    SystemClock,
};
use trawl_engine::{ProcessExit, Scheduler, SchedulerConfig, SchedulerDeps};
use trawl_storage::{DocumentState, MemoryJobStore};

#[derive(Default)]
struct RecordingExit(Mutex<Vec<i32>>);

impl ProcessExit for RecordingExit {
    fn exit(&self, code: i32) {
        self.0.lock().unwrap().push(code);
    }
}

fn config() -> SchedulerConfig {
    SchedulerConfig {
        workers: 3,
        max_queue_multiplier: 2,
        full_queue_poll: Duration::from_millis(2),
        idle_backoff: Duration::from_millis(5),
        reset_cooldown: Duration::from_millis(10),
        expire_sweep_interval: Duration::from_millis(50),
    }
}

fn start(store: &Arc<MemoryJobStore>, exit: Arc<RecordingExit>) -> Scheduler {
    let deps = SchedulerDeps {
        store: store.clone(),
        loader: store.clone(),
        cache: Arc::new(CacheManager::new(Arc::new(LockManager::new()), Arc::new(SystemClock))),
        clock: Arc::new(SystemClock),
        exit,
    };
    Scheduler::start(&config(), deps).unwrap()
}

fn seed(store: &MemoryJobStore, jobs: u64, per_job: usize, kind: LifecycleKind) -> usize {
    for job in 1..=jobs {
        store.add_job(JobDescription::new(JobId(job), "job", format!("repo-{}", job % 2), "solr"));
        for i in 0..per_job {
            store.add_document(JobId(job), format!("{job}/{i}"), DocumentState::pending(kind), true);
        }
    }
    jobs as usize * per_job
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let until = Instant::now() + deadline;
    while Instant::now() < until {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

/// Workers drain one queue, rating batches by bin load, until told to stop
fn workers(
    scheduler: &Scheduler,
    store: &Arc<MemoryJobStore>,
    kind: LifecycleKind,
    count: usize,
    processed: &Arc<AtomicUsize>,
) -> Vec<thread::JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let queue = scheduler.queue(kind).unwrap();
            let tracker = scheduler.tracker();
            let stop = scheduler.stop_signal();
            let store = Arc::clone(store);
            let processed = Arc::clone(processed);
            thread::spawn(move || {
                while !stop.is_stopped() {
                    let Some(batch) = queue.get_document_timeout(tracker.as_ref(), Duration::from_millis(20))
                    else {
                        continue;
                    };
                    let bins = batch.bins();
                    tracker.begin_processing(&bins);
                    let ids: Vec<DocumentId> = batch.documents().iter().map(|d| d.id).collect();
                    store.mark_complete(&ids);
                    processed.fetch_add(ids.len(), Ordering::SeqCst);
                    tracker.end_processing(&bins);
                }
            })
        })
        .collect()
}

#[test]
fn every_document_is_processed_exactly_once() {
    let store = Arc::new(MemoryJobStore::new(7));
    let total = seed(&store, 6, 9, LifecycleKind::Cleanup);
    let scheduler = start(&store, Arc::new(RecordingExit::default()));
    let processed = Arc::new(AtomicUsize::new(0));
    let pool = workers(&scheduler, &store, LifecycleKind::Cleanup, 3, &processed);

    assert!(wait_until(Duration::from_secs(10), || processed.load(Ordering::SeqCst) >= total));
    scheduler.shutdown();
    for worker in pool {
        worker.join().unwrap();
    }
    assert_eq!(processed.load(Ordering::SeqCst), total);
    assert_eq!(store.count_in(DocumentState::PendingCleanup), 0);
    assert_eq!(store.count_in(DocumentState::BeingCleaned), 0);
}

#[test]
fn queue_never_exceeds_its_bound_without_consumers() {
    let store = Arc::new(MemoryJobStore::new(1));
    seed(&store, 20, 1, LifecycleKind::Delete);
    let scheduler = start(&store, Arc::new(RecordingExit::default()));
    let queue = scheduler.queue(LifecycleKind::Delete).unwrap();

    assert!(wait_until(Duration::from_secs(5), || queue.len() >= 4));
    thread::sleep(Duration::from_millis(50));
    assert!(queue.len() <= 4);
    assert!(store.count_in(DocumentState::PendingDelete) >= 16);
    scheduler.shutdown();
}

#[test]
fn wide_in_clause_still_respects_the_queue_bound() {
    let store = Arc::new(MemoryJobStore::new(50));
    seed(&store, 20, 1, LifecycleKind::Delete);
    let scheduler = start(&store, Arc::new(RecordingExit::default()));
    let queue = scheduler.queue(LifecycleKind::Delete).unwrap();
    assert_eq!(queue.capacity(), 6);

    assert!(wait_until(Duration::from_secs(5), || queue.len() >= 6));
    thread::sleep(Duration::from_millis(200));
    assert_eq!(queue.len(), 6);
    assert_eq!(store.count_in(DocumentState::PendingDelete), 14);
    scheduler.shutdown();
}

#[test]
fn lost_connection_triggers_reset_and_work_resumes() {
    let store = Arc::new(MemoryJobStore::new(50));
    let exit = Arc::new(RecordingExit::default());
    store.inject_fault(JobStoreError::ConnectionLost("socket closed".into()));
    let total = seed(&store, 2, 3, LifecycleKind::Expire);
    let scheduler = start(&store, Arc::clone(&exit));
    let processed = Arc::new(AtomicUsize::new(0));
    let pool = workers(&scheduler, &store, LifecycleKind::Expire, 2, &processed);

    let resets = scheduler.resets();
    assert!(wait_until(Duration::from_secs(10), || resets.epoch() >= 1));
    assert!(wait_until(Duration::from_secs(10), || processed.load(Ordering::SeqCst) >= total));

    scheduler.shutdown();
    for worker in pool {
        worker.join().unwrap();
    }
    assert!(exit.0.lock().unwrap().is_empty());
}
