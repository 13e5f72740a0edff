// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

const REGISTRY_LOCK: &str = "TRANSFORMATIONS_LOCK";

#[test]
fn non_exclusive_writers_share_but_exclude_list_readers() {
    let locks = Arc::new(LockManager::new());
    locks.enter_non_ex_write_lock(REGISTRY_LOCK);

    let other = Arc::clone(&locks);
    let (writer_ok, reader_ok) = thread::spawn(move || {
        let writer = other.try_enter(REGISTRY_LOCK, LockMode::NonExWrite).is_ok();
        if writer {
            other.leave_non_ex_write_lock(REGISTRY_LOCK).unwrap();
        }
        let reader = other.try_enter(REGISTRY_LOCK, LockMode::Read).is_ok();
        (writer, reader)
    })
    .join()
    .unwrap();

    assert!(writer_ok);
    assert!(!reader_ok);
    locks.leave_non_ex_write_lock(REGISTRY_LOCK).unwrap();
    assert!(!locks.is_locked(REGISTRY_LOCK));
}

#[test]
fn try_enter_reports_would_block() {
    let locks = Arc::new(LockManager::new());
    locks.enter_write_lock("x");
    let other = Arc::clone(&locks);
    let err = thread::spawn(move || other.try_enter("x", LockMode::Read).unwrap_err())
        .join()
        .unwrap();
    assert_eq!(
        err,
        LockError::WouldBlock {
            name: "x".into(),
            mode: LockMode::Read
        }
    );
    locks.leave_write_lock("x").unwrap();
}

#[test]
fn leave_unheld_lock_is_an_error() {
    let locks = LockManager::new();
    let err = locks.leave_read_lock("nothing").unwrap_err();
    assert!(matches!(err, LockError::NotHeld { ref name, mode: LockMode::Read } if name == "nothing"));
}

#[test]
fn guard_releases_on_drop() {
    let locks = LockManager::new();
    {
        let _guard = locks.guard("scoped", LockMode::Write);
        assert_eq!(locks.held("scoped", LockMode::Write), 1);
    }
    assert!(!locks.is_locked("scoped"));
}

#[test]
fn lock_set_merges_duplicate_names_into_write() {
    let locks = Arc::new(LockManager::new());
    let read = vec!["k1".to_string(), "k2".to_string()];
    let write = vec!["k2".to_string()];
    locks.enter_locks(&read, &[], &write);

    assert_eq!(locks.held("k1", LockMode::Read), 1);
    assert_eq!(locks.held("k2", LockMode::Write), 1);
    assert_eq!(locks.held("k2", LockMode::Read), 0);

    locks.leave_locks(&read, &[], &write).unwrap();
    assert!(!locks.is_locked("k1"));
    assert!(!locks.is_locked("k2"));
}

#[test]
fn leave_locks_releases_everything_and_reports_first_failure() {
    let locks = LockManager::new();
    locks.enter_locks(&["a".to_string()], &[], &[]);
    let err = locks
        .leave_locks(&["a".to_string(), "b".to_string()], &[], &[])
        .unwrap_err();
    assert!(matches!(err, LockError::NotHeld { ref name, .. } if name == "b"));
    assert!(!locks.is_locked("a"));
}

#[test]
fn opposite_order_lock_sets_do_not_deadlock() {
    let locks = Arc::new(LockManager::new());
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [vec!["a", "b"], vec!["b", "a"]]
        .into_iter()
        .map(|names| {
            let locks = Arc::clone(&locks);
            let barrier = Arc::clone(&barrier);
            let names: Vec<String> = names.into_iter().map(String::from).collect();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..200 {
                    locks.enter_locks(&[], &[], &names);
                    locks.leave_locks(&[], &[], &names).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn critical_section_serializes_creators() {
    let locks = Arc::new(LockManager::new());
    let key = SectionKey::new("connection", ["alpha"]);
    let inside = Arc::new(AtomicU32::new(0));
    let max_inside = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            thread::spawn(move || {
                locks.enter_critical_sections(std::slice::from_ref(&key), LockMode::Write);
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                inside.fetch_sub(1, Ordering::SeqCst);
                locks
                    .leave_critical_sections(std::slice::from_ref(&key), LockMode::Write)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert!(!locks.is_section_held(&key));
}

#[test]
fn section_keys_with_separators_stay_distinct() {
    let a = SectionKey::new("conn", ["a-b", "c"]);
    let b = SectionKey::new("conn", ["a", "b-c"]);
    assert_ne!(a, b);

    let locks = Arc::new(LockManager::new());
    locks.enter_critical_section(&a, LockMode::Write);
    let other = Arc::clone(&locks);
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        other.enter_critical_section(&b, LockMode::Write);
        tx.send(()).unwrap();
        other.leave_critical_section(&b, LockMode::Write).unwrap();
    });
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    locks.leave_critical_section(&a, LockMode::Write).unwrap();
}
