// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed object cache
//!
//! Objects are identified by a [`CacheDescription`]. Creation of any one
//! object is serialized through a critical section named after its key, so
//! concurrent requesters either see the cached value or wait for the single
//! creator. Invalidation requested inside a cache section only happens when
//! the section completes, and inside a transaction only when the outermost
//! transaction commits.

mod description;
mod manager;
mod store;

pub use description::{CacheClass, CacheDescription, ObjectKey};
pub use manager::{CacheError, CacheExecutor, CacheHandle, CacheManager, CreateHandle};
