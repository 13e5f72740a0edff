// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trawl-core: concurrency substrate for the crawl scheduler
//!
//! This crate provides:
//! - Named shared/non-exclusive/exclusive locks and critical sections
//! - A keyed object cache with at-most-one-creator semantics and
//!   transaction-scoped invalidation
//! - The rating-ordered document queue fed by the stuffer threads
//! - The document/job data model and the job-store collaborator traits

pub mod clock;
pub mod id;

pub mod cache;
pub mod document;
pub mod jobs;
pub mod lock;
pub mod queue;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, TransactionId, UuidIdGen};

pub use cache::{
    CacheClass, CacheDescription, CacheError, CacheExecutor, CacheHandle, CacheManager,
    CreateHandle, ObjectKey,
};
pub use document::{
    BatchError, DocumentBatch, DocumentDescriptor, DocumentId, JobDescription, JobId,
    LifecycleKind,
};
pub use jobs::{JobLoader, JobStore, JobStoreError};
pub use lock::{LockError, LockManager, LockMode, SectionKey};
pub use queue::{BinTracker, DocumentQueue, RatingContext};
