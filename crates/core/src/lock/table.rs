// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reader/writer lock table keyed by name
//!
//! Ownership is per thread: a thread may re-enter any lock it already holds,
//! in any mode, and only holdings of *other* threads count as conflicts.
//! Every grant and release happens under one mutex; releases broadcast on a
//! single condition variable and blocked callers re-check their own key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

/// Lock family
///
/// `Read` holders share with each other. `NonExWrite` holders share with each
/// other but exclude readers. `Write` excludes everyone else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockMode {
    Read,
    NonExWrite,
    Write,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LockMode::Read => "read",
            LockMode::NonExWrite => "non-exclusive write",
            LockMode::Write => "write",
        };
        f.write_str(s)
    }
}

/// Current holders of one named lock
#[derive(Debug, Default)]
struct Holdings {
    read: HashMap<ThreadId, u32>,
    non_ex: HashMap<ThreadId, u32>,
    write: Option<(ThreadId, u32)>,
}

fn held_by_other(map: &HashMap<ThreadId, u32>, me: ThreadId) -> bool {
    map.keys().any(|t| *t != me)
}

impl Holdings {
    fn writer_is_other(&self, me: ThreadId) -> bool {
        matches!(self.write, Some((t, _)) if t != me)
    }

    fn admits(&self, mode: LockMode, me: ThreadId) -> bool {
        if self.writer_is_other(me) {
            return false;
        }
        match mode {
            LockMode::Read => !held_by_other(&self.non_ex, me),
            LockMode::NonExWrite => !held_by_other(&self.read, me),
            LockMode::Write => !held_by_other(&self.read, me) && !held_by_other(&self.non_ex, me),
        }
    }

    fn grant(&mut self, mode: LockMode, me: ThreadId) {
        match mode {
            LockMode::Read => *self.read.entry(me).or_insert(0) += 1,
            LockMode::NonExWrite => *self.non_ex.entry(me).or_insert(0) += 1,
            LockMode::Write => match &mut self.write {
                Some((_, count)) => *count += 1,
                None => self.write = Some((me, 1)),
            },
        }
    }

    /// Returns false if `me` held nothing in `mode`
    fn release(&mut self, mode: LockMode, me: ThreadId) -> bool {
        fn dec(map: &mut HashMap<ThreadId, u32>, me: ThreadId) -> bool {
            match map.get_mut(&me) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    true
                }
                Some(_) => {
                    map.remove(&me);
                    true
                }
                None => false,
            }
        }
        match mode {
            LockMode::Read => dec(&mut self.read, me),
            LockMode::NonExWrite => dec(&mut self.non_ex, me),
            LockMode::Write => match self.write {
                Some((t, count)) if t == me => {
                    self.write = if count > 1 { Some((t, count - 1)) } else { None };
                    true
                }
                _ => false,
            },
        }
    }

    fn count(&self, mode: LockMode, me: ThreadId) -> u32 {
        match mode {
            LockMode::Read => self.read.get(&me).copied().unwrap_or(0),
            LockMode::NonExWrite => self.non_ex.get(&me).copied().unwrap_or(0),
            LockMode::Write => match self.write {
                Some((t, count)) if t == me => count,
                _ => 0,
            },
        }
    }

    fn is_empty(&self) -> bool {
        self.read.is_empty() && self.non_ex.is_empty() && self.write.is_none()
    }
}

/// A table of named reader/writer locks
#[derive(Debug)]
pub(crate) struct LockTable<K> {
    entries: Mutex<HashMap<K, Holdings>>,
    released: Condvar,
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            released: Condvar::new(),
        }
    }

    /// Block until `key` can be held in `mode` by the calling thread
    pub(crate) fn enter(&self, key: &K, mode: LockMode) {
        let me = thread::current().id();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if entries.get(key).map_or(true, |h| h.admits(mode, me)) {
                entries.entry(key.clone()).or_default().grant(mode, me);
                return;
            }
            entries = self
                .released
                .wait(entries)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Take `key` in `mode` only if that does not require waiting
    pub(crate) fn try_enter(&self, key: &K, mode: LockMode) -> bool {
        let me = thread::current().id();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).map_or(true, |h| h.admits(mode, me)) {
            entries.entry(key.clone()).or_default().grant(mode, me);
            true
        } else {
            false
        }
    }

    /// Drop one level of the calling thread's hold on `key`
    ///
    /// Returns false if the thread did not hold `key` in `mode`.
    pub(crate) fn leave(&self, key: &K, mode: LockMode) -> bool {
        let me = thread::current().id();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(holdings) = entries.get_mut(key) else {
            return false;
        };
        if !holdings.release(mode, me) {
            return false;
        }
        if holdings.is_empty() {
            entries.remove(key);
        }
        drop(entries);
        self.released.notify_all();
        true
    }

    /// How many times the calling thread holds `key` in `mode`
    pub(crate) fn held(&self, key: &K, mode: LockMode) -> u32 {
        let me = thread::current().id();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).map_or(0, |h| h.count(mode, me))
    }

    /// Whether any thread holds `key` in any mode
    pub(crate) fn is_held(&self, key: &K) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(key)
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
