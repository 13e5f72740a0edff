// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator traits for the persistent job store

use crate::document::{DocumentDescriptor, JobDescription, JobId, LifecycleKind};
use thiserror::Error;

/// Failures reported by the job store
///
/// The variants are the classes the stuffer failure policy distinguishes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("interrupted")]
    Interrupted,
    #[error("store connection lost: {0}")]
    ConnectionLost(String),
    #[error("setup error: {0}")]
    Setup(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("job store error: {0}")]
    Other(String),
}

/// Source of documents awaiting an end-of-life transition
pub trait JobStore: Send + Sync {
    /// Largest id list a single fetch may touch
    fn max_in_clause(&self) -> usize;

    /// Fetch up to `limit` documents pending `kind` and, in the same atomic
    /// step, mark them as being processed so nothing else can claim them.
    fn fetch_and_mark(
        &self,
        kind: LifecycleKind,
        limit: usize,
    ) -> Result<Vec<DocumentDescriptor>, JobStoreError>;

    /// Return every document of `kind` that is marked in-flight to pending.
    /// Called once queued work has been discarded after a reset.
    fn reset_in_flight(&self, kind: LifecycleKind) -> Result<usize, JobStoreError>;
}

/// Loads job descriptions by id
pub trait JobLoader: Send + Sync {
    fn load_job(&self, id: JobId) -> Result<Option<JobDescription>, JobStoreError>;
}
