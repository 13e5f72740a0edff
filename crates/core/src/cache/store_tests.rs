// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn key(name: &str) -> ObjectKey {
    ObjectKey::new("conn", [name])
}

fn entry(store: &mut ObjectStore, keys: &[&str], value: u32) -> Entry {
    Entry {
        value: Arc::new(value),
        keys: keys.iter().map(|k| k.to_string()).collect(),
        created: store.next_seq(),
        expires_at: None,
        class: None,
    }
}

fn read(store: &mut ObjectStore, name: &str, now: Instant) -> Option<u32> {
    store
        .get(&key(name), now)
        .and_then(|v| v.downcast_ref::<u32>().copied())
}

#[test]
fn insert_then_get() {
    let mut store = ObjectStore::default();
    let e = entry(&mut store, &["k"], 7);
    assert!(store.insert(key("a"), e));
    assert_eq!(read(&mut store, "a", Instant::now()), Some(7));
}

#[test]
fn invalidate_drops_objects_sharing_a_key() {
    let mut store = ObjectStore::default();
    let a = entry(&mut store, &["list", "a"], 1);
    let b = entry(&mut store, &["list", "b"], 2);
    let c = entry(&mut store, &["c"], 3);
    store.insert(key("a"), a);
    store.insert(key("b"), b);
    store.insert(key("c"), c);

    let keys: BTreeSet<String> = ["list".to_string()].into_iter().collect();
    assert_eq!(store.invalidate(&keys), 2);
    assert!(!store.contains(&key("a")));
    assert!(!store.contains(&key("b")));
    assert!(store.contains(&key("c")));
}

#[test]
fn creation_that_began_before_invalidation_is_refused() {
    let mut store = ObjectStore::default();
    let late = entry(&mut store, &["k"], 1);
    store.invalidate(&["k".to_string()].into_iter().collect());
    assert!(!store.insert(key("a"), late));
    assert!(!store.contains(&key("a")));

    let fresh = entry(&mut store, &["k"], 2);
    assert!(store.insert(key("a"), fresh));
}

#[test]
fn expired_objects_miss_and_sweep() {
    let mut store = ObjectStore::default();
    let now = Instant::now();
    let mut short = entry(&mut store, &["k"], 1);
    short.expires_at = Some(now + Duration::from_secs(1));
    let mut long = entry(&mut store, &["k"], 2);
    long.expires_at = Some(now + Duration::from_secs(60));
    store.insert(key("short"), short);
    store.insert(key("long"), long);

    assert_eq!(read(&mut store, "short", now), Some(1));
    assert_eq!(store.expire(now + Duration::from_secs(1)), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(read(&mut store, "long", now + Duration::from_secs(60)), None);
    assert_eq!(store.len(), 0);
}

#[test]
fn lru_class_evicts_least_recently_used() {
    let mut store = ObjectStore::default();
    let class = CacheClass::new("conn", Some(2));
    for (name, v) in [("a", 1), ("b", 2)] {
        let mut e = entry(&mut store, &["k"], v);
        e.class = Some(class.clone());
        store.insert(key(name), e);
    }
    // touch "a" so "b" becomes the eviction candidate
    assert_eq!(read(&mut store, "a", Instant::now()), Some(1));

    let mut e = entry(&mut store, &["k"], 3);
    e.class = Some(class);
    store.insert(key("c"), e);

    assert!(store.contains(&key("a")));
    assert!(!store.contains(&key("b")));
    assert!(store.contains(&key("c")));
}

#[test]
fn objects_without_class_are_never_evicted() {
    let mut store = ObjectStore::default();
    for n in 0..50 {
        let e = entry(&mut store, &["k"], n);
        store.insert(key(&n.to_string()), e);
    }
    assert_eq!(store.len(), 50);
}
