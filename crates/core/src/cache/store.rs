// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Committed cache contents
//!
//! Ordering uses a sequence counter instead of wall time: every creation
//! start and every invalidation draws the next number, so "invalidated at or
//! after creation" is exact even under a frozen clock.

use super::description::{CacheClass, ObjectKey};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

pub(super) type Value = Arc<dyn Any + Send + Sync>;

/// One cached object
#[derive(Clone)]
pub(super) struct Entry {
    pub value: Value,
    pub keys: BTreeSet<String>,
    /// Sequence number drawn when creation of this object began
    pub created: u64,
    pub expires_at: Option<Instant>,
    pub class: Option<CacheClass>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("keys", &self.keys)
            .field("created", &self.created)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Slot {
    entry: Entry,
    last_used: u64,
}

#[derive(Debug, Default)]
pub(super) struct ObjectStore {
    objects: HashMap<ObjectKey, Slot>,
    /// Per LRU class: last-use tick to object
    lru: HashMap<String, BTreeMap<u64, ObjectKey>>,
    /// Invalidation key to the sequence number of its latest invalidation
    stamps: HashMap<String, u64>,
    seq: u64,
}

impl ObjectStore {
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// True if any of `keys` was invalidated at or after `created`
    pub fn is_stale(&self, keys: &BTreeSet<String>, created: u64) -> bool {
        keys.iter()
            .any(|k| self.stamps.get(k).is_some_and(|stamp| *stamp >= created))
    }

    /// Fetch a live object, dropping it if expired or stale
    pub fn get(&mut self, key: &ObjectKey, now: Instant) -> Option<Value> {
        let slot = self.objects.get(key)?;
        let expired = slot.entry.expires_at.is_some_and(|at| at <= now);
        if expired || self.is_stale(&slot.entry.keys, slot.entry.created) {
            self.remove(key);
            return None;
        }
        let tick = self.next_seq();
        let slot = self.objects.get_mut(key)?;
        let previous = std::mem::replace(&mut slot.last_used, tick);
        let value = Arc::clone(&slot.entry.value);
        if let Some(class) = &slot.entry.class {
            if let Some(order) = self.lru.get_mut(&class.name) {
                order.remove(&previous);
                order.insert(tick, key.clone());
            }
        }
        Some(value)
    }

    /// Store an object; returns false if it went stale before it arrived
    pub fn insert(&mut self, key: ObjectKey, entry: Entry) -> bool {
        if self.is_stale(&entry.keys, entry.created) {
            return false;
        }
        self.remove(&key);
        let tick = self.next_seq();
        if let Some(class) = &entry.class {
            let order = self.lru.entry(class.name.clone()).or_default();
            order.insert(tick, key.clone());
            if let Some(max) = class.max_lru_count {
                let mut evicted = Vec::new();
                while order.len() > max.max(1) {
                    match order.pop_first() {
                        Some((_, victim)) => evicted.push(victim),
                        None => break,
                    }
                }
                for victim in evicted {
                    tracing::trace!(object = %victim, class = %class.name, "lru eviction");
                    self.objects.remove(&victim);
                }
            }
        }
        self.objects.insert(
            key,
            Slot {
                entry,
                last_used: tick,
            },
        );
        true
    }

    pub fn remove(&mut self, key: &ObjectKey) -> Option<Entry> {
        let slot = self.objects.remove(key)?;
        if let Some(class) = &slot.entry.class {
            if let Some(order) = self.lru.get_mut(&class.name) {
                order.remove(&slot.last_used);
            }
        }
        Some(slot.entry)
    }

    /// Stamp `keys` and drop every object filed under any of them
    pub fn invalidate(&mut self, keys: &BTreeSet<String>) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let stamp = self.next_seq();
        for key in keys {
            self.stamps.insert(key.clone(), stamp);
        }
        let doomed: Vec<ObjectKey> = self
            .objects
            .iter()
            .filter(|(_, slot)| !slot.entry.keys.is_disjoint(keys))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    /// Drop every object whose expiration is at or before `now`
    pub fn expire(&mut self, now: Instant) -> usize {
        let doomed: Vec<ObjectKey> = self
            .objects
            .iter()
            .filter(|(_, slot)| slot.entry.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    pub fn set_expiration(&mut self, key: &ObjectKey, at: Instant) {
        if let Some(slot) = self.objects.get_mut(key) {
            slot.entry.expires_at = Some(at);
        }
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
