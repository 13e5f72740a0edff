// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named locking for every stateful manager
//!
//! This module provides:
//! - **Locks** - reader/writer family keyed by resource name (read,
//!   non-exclusive write, exclusive write)
//! - **Critical sections** - the same family keyed by a structured
//!   [`SectionKey`], used by the cache to serialize object creation
//! - **LockGuard** - scope-bound release for single locks

mod manager;
mod table;

pub use manager::{LockError, LockGuard, LockManager, SectionKey};
pub use table::LockMode;
