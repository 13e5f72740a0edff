// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock manager: named locks plus critical sections

use super::table::{LockMode, LockTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from releasing or probing locks
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("{mode} lock '{name}' is not held by this thread")]
    NotHeld { name: String, mode: LockMode },
    #[error("{mode} lock '{name}' is held elsewhere")]
    WouldBlock { name: String, mode: LockMode },
}

/// Structured name of a critical section
///
/// A type tag plus the identity fields of the object being guarded. Keeping
/// the fields apart means two identities can never collide through a
/// separator character appearing inside one of them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionKey {
    pub tag: String,
    pub parts: Vec<String>,
}

impl SectionKey {
    pub fn new<I, S>(tag: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: tag.into(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:?}", self.tag, self.parts)
    }
}

/// Process-wide lock manager
///
/// Construct one per process and pass it by `Arc` to every manager that
/// needs it. Locks are owned by the thread that entered them and must be
/// left on that same thread.
#[derive(Debug)]
pub struct LockManager {
    locks: LockTable<String>,
    sections: LockTable<SectionKey>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            locks: LockTable::new(),
            sections: LockTable::new(),
        }
    }

    // === Single locks ===

    /// Block until `name` is held in `mode`
    pub fn enter(&self, name: &str, mode: LockMode) {
        tracing::trace!(name, %mode, "entering lock");
        self.locks.enter(&name.to_string(), mode);
    }

    /// Take `name` in `mode` without waiting
    pub fn try_enter(&self, name: &str, mode: LockMode) -> Result<(), LockError> {
        if self.locks.try_enter(&name.to_string(), mode) {
            Ok(())
        } else {
            Err(LockError::WouldBlock {
                name: name.to_string(),
                mode,
            })
        }
    }

    pub fn leave(&self, name: &str, mode: LockMode) -> Result<(), LockError> {
        tracing::trace!(name, %mode, "leaving lock");
        if self.locks.leave(&name.to_string(), mode) {
            Ok(())
        } else {
            Err(LockError::NotHeld {
                name: name.to_string(),
                mode,
            })
        }
    }

    /// Enter `name` and release it when the guard drops
    pub fn guard(&self, name: &str, mode: LockMode) -> LockGuard<'_> {
        self.enter(name, mode);
        LockGuard {
            manager: self,
            name: name.to_string(),
            mode,
        }
    }

    pub fn enter_read_lock(&self, name: &str) {
        self.enter(name, LockMode::Read);
    }

    pub fn leave_read_lock(&self, name: &str) -> Result<(), LockError> {
        self.leave(name, LockMode::Read)
    }

    pub fn enter_non_ex_write_lock(&self, name: &str) {
        self.enter(name, LockMode::NonExWrite);
    }

    pub fn leave_non_ex_write_lock(&self, name: &str) -> Result<(), LockError> {
        self.leave(name, LockMode::NonExWrite)
    }

    pub fn enter_write_lock(&self, name: &str) {
        self.enter(name, LockMode::Write);
    }

    pub fn leave_write_lock(&self, name: &str) -> Result<(), LockError> {
        self.leave(name, LockMode::Write)
    }

    /// How many times this thread holds `name` in `mode`
    pub fn held(&self, name: &str, mode: LockMode) -> u32 {
        self.locks.held(&name.to_string(), mode)
    }

    /// Whether any thread holds `name`
    pub fn is_locked(&self, name: &str) -> bool {
        self.locks.is_held(&name.to_string())
    }

    // === Lock sets ===

    /// Enter a set of locks in one global (sorted) order
    ///
    /// A name listed under several modes is taken once, exclusively.
    pub fn enter_locks(&self, read: &[String], non_ex: &[String], write: &[String]) {
        let plan = plan(read, non_ex, write);
        tracing::debug!(count = plan.len(), "entering lock set");
        for (name, mode) in &plan {
            self.locks.enter(name, *mode);
        }
    }

    /// Leave a set previously passed to [`enter_locks`](Self::enter_locks)
    ///
    /// Every lock is released even if one of them was not held; the first
    /// such failure is reported.
    pub fn leave_locks(
        &self,
        read: &[String],
        non_ex: &[String],
        write: &[String],
    ) -> Result<(), LockError> {
        let mut first_error = None;
        for (name, mode) in plan(read, non_ex, write).into_iter().rev() {
            if !self.locks.leave(&name, mode) && first_error.is_none() {
                first_error = Some(LockError::NotHeld { name, mode });
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // === Critical sections ===

    pub fn enter_critical_section(&self, key: &SectionKey, mode: LockMode) {
        self.sections.enter(key, mode);
    }

    pub fn leave_critical_section(&self, key: &SectionKey, mode: LockMode) -> Result<(), LockError> {
        if self.sections.leave(key, mode) {
            Ok(())
        } else {
            Err(LockError::NotHeld {
                name: key.to_string(),
                mode,
            })
        }
    }

    /// Enter several critical sections in sorted order
    pub fn enter_critical_sections(&self, keys: &[SectionKey], mode: LockMode) {
        let mut sorted: Vec<&SectionKey> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();
        for key in sorted {
            self.sections.enter(key, mode);
        }
    }

    pub fn leave_critical_sections(
        &self,
        keys: &[SectionKey],
        mode: LockMode,
    ) -> Result<(), LockError> {
        let mut sorted: Vec<&SectionKey> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();
        let mut first_error = None;
        for key in sorted.into_iter().rev() {
            if let Err(e) = self.leave_critical_section(key, mode) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Whether any thread is inside the section
    pub fn is_section_held(&self, key: &SectionKey) -> bool {
        self.sections.is_held(key)
    }
}

/// Releases a single lock on drop
#[derive(Debug)]
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    name: String,
    mode: LockMode,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.manager.leave(&self.name, self.mode) {
            tracing::warn!(error = %e, "lock guard released a lock it did not hold");
        }
    }
}

/// Sorted, de-duplicated acquisition order for a lock set
fn plan(read: &[String], non_ex: &[String], write: &[String]) -> Vec<(String, LockMode)> {
    let mut modes: BTreeMap<&str, LockMode> = BTreeMap::new();
    let listed = read
        .iter()
        .map(|n| (n, LockMode::Read))
        .chain(non_ex.iter().map(|n| (n, LockMode::NonExWrite)))
        .chain(write.iter().map(|n| (n, LockMode::Write)));
    for (name, mode) in listed {
        modes
            .entry(name.as_str())
            .and_modify(|m| {
                if *m != mode {
                    *m = LockMode::Write;
                }
            })
            .or_insert(mode);
    }
    modes
        .into_iter()
        .map(|(name, mode)| (name.to_string(), mode))
        .collect()
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
