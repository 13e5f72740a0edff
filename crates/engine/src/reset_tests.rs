// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::thread;
use std::time::Instant;
use trawl_core::{DocumentBatch, DocumentDescriptor, DocumentId, JobDescription, JobId};
use trawl_storage::{DocumentState, MemoryJobStore};

fn batch(id: u64) -> DocumentBatch {
    let job = Arc::new(JobDescription::new(JobId(1), "job", "repo", "out"));
    let doc = DocumentDescriptor::new(DocumentId(id), JobId(1), format!("doc-{id}"), true);
    DocumentBatch::new(LifecycleKind::Delete, job, vec![doc]).unwrap()
}

fn setup() -> (Arc<MemoryJobStore>, Arc<DocumentQueue>, Arc<ResetManager>) {
    let store = Arc::new(MemoryJobStore::new(10));
    let queue = Arc::new(DocumentQueue::new("delete", 10));
    let resets = Arc::new(ResetManager::new(store.clone()));
    resets.register_queue(LifecycleKind::Delete, Arc::clone(&queue));
    (store, queue, resets)
}

#[test]
fn no_pending_reset_means_no_wait() {
    let (_, _, resets) = setup();
    let participant = resets.register();
    assert!(participant.wait_for_reset(&StopSignal::new()));
    assert_eq!(resets.epoch(), 0);
}

#[test]
fn reset_without_participants_completes_at_once() {
    let (_, queue, resets) = setup();
    queue.add_document(batch(1));

    resets.note_event();
    assert!(!resets.is_resetting());
    assert_eq!(resets.epoch(), 1);
    assert!(queue.is_empty());
    assert!(queue.add_document(batch(2)));
}

#[test]
fn last_participant_performs_the_reset() {
    let (store, queue, resets) = setup();
    let doc = store.add_document(JobId(1), "a", DocumentState::BeingDeleted, true);
    queue.add_document(batch(1));
    let first = resets.register();
    let second = resets.register();

    resets.note_event();
    assert!(resets.is_resetting());
    assert!(!queue.add_document(batch(2)));

    let waiter = thread::spawn(move || first.wait_for_reset(&StopSignal::new()));
    thread::sleep(Duration::from_millis(30));
    assert!(resets.is_resetting());

    assert!(second.wait_for_reset(&StopSignal::new()));
    assert!(waiter.join().unwrap());
    assert_eq!(resets.epoch(), 1);
    assert!(queue.is_empty());
    assert_eq!(store.state_of(doc), Some(DocumentState::PendingDelete));
}

#[test]
fn departing_participant_unblocks_the_rest() {
    let (_, _, resets) = setup();
    let stays = resets.register();
    let leaves = resets.register();
    resets.note_event();

    let waiter = thread::spawn(move || stays.wait_for_reset(&StopSignal::new()));
    thread::sleep(Duration::from_millis(30));
    drop(leaves);

    assert!(waiter.join().unwrap());
    assert_eq!(resets.epoch(), 1);
}

#[test]
fn stop_releases_a_waiting_participant() {
    let (_, _, resets) = setup();
    let waiting = resets.register();
    let _other = resets.register();
    resets.note_event();

    let stop = StopSignal::new();
    let signal = stop.clone();
    let started = Instant::now();
    let handle = thread::spawn(move || waiting.wait_for_reset(&signal));
    thread::sleep(Duration::from_millis(30));
    stop.stop();

    assert!(!handle.join().unwrap());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(resets.is_resetting());
}

#[test]
fn complete_reset_forces_completion() {
    let (_, _, resets) = setup();
    let _participant = resets.register();
    resets.note_event();
    assert!(resets.is_resetting());

    resets.complete_reset();
    assert!(!resets.is_resetting());
    resets.complete_reset();
    assert_eq!(resets.epoch(), 1);
}

#[test]
fn trackers_drop_counts_across_a_reset() {
    let (_, _, resets) = setup();
    let tracker = Arc::new(BinTracker::new());
    resets.register_tracker(Arc::clone(&tracker));
    tracker.begin_processing(&["repo".to_string()]);

    let _participant = resets.register();
    resets.note_event();
    tracker.begin_processing(&["repo".to_string()]);
    assert_eq!(tracker.active("repo"), 0);

    resets.complete_reset();
    tracker.begin_processing(&["repo".to_string()]);
    assert_eq!(tracker.active("repo"), 1);
}
