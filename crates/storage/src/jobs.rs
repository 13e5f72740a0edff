// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job store
//!
//! Holds jobs and the lifecycle state of their documents. Fetch-and-mark
//! runs under the store's single lock, so no two callers can claim the same
//! document.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use trawl_core::{
    DocumentDescriptor, DocumentId, JobDescription, JobId, JobLoader, JobStore, JobStoreError,
    LifecycleKind,
};

/// Lifecycle state of one document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Active,
    PendingDelete,
    BeingDeleted,
    PendingCleanup,
    BeingCleaned,
    PendingExpire,
    BeingExpired,
}

impl DocumentState {
    /// State a document waits in before `kind` picks it up
    pub fn pending(kind: LifecycleKind) -> Self {
        match kind {
            LifecycleKind::Delete => DocumentState::PendingDelete,
            LifecycleKind::Cleanup => DocumentState::PendingCleanup,
            LifecycleKind::Expire => DocumentState::PendingExpire,
        }
    }

    /// State of a document handed out for `kind`
    pub fn in_flight(kind: LifecycleKind) -> Self {
        match kind {
            LifecycleKind::Delete => DocumentState::BeingDeleted,
            LifecycleKind::Cleanup => DocumentState::BeingCleaned,
            LifecycleKind::Expire => DocumentState::BeingExpired,
        }
    }
}

#[derive(Clone, Debug)]
struct DocumentRecord {
    job_id: JobId,
    identifier: String,
    state: DocumentState,
    /// Whether the document ever reached the output index
    indexed: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    jobs: BTreeMap<JobId, JobDescription>,
    documents: BTreeMap<DocumentId, DocumentRecord>,
    next_document: u64,
    /// Failures handed out by the next fetches, oldest first
    faults: VecDeque<JobStoreError>,
}

#[derive(Debug)]
pub struct MemoryJobStore {
    max_in_clause: usize,
    state: Mutex<StoreState>,
}

impl MemoryJobStore {
    pub fn new(max_in_clause: usize) -> Self {
        Self {
            max_in_clause: max_in_clause.max(1),
            state: Mutex::new(StoreState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_job(&self, job: JobDescription) {
        self.lock().jobs.insert(job.id, job);
    }

    pub fn remove_job(&self, id: JobId) -> Option<JobDescription> {
        self.lock().jobs.remove(&id)
    }

    /// Register a document and return its id
    pub fn add_document(
        &self,
        job_id: JobId,
        identifier: impl Into<String>,
        state: DocumentState,
        indexed: bool,
    ) -> DocumentId {
        let mut store = self.lock();
        store.next_document += 1;
        let id = DocumentId(store.next_document);
        store.documents.insert(
            id,
            DocumentRecord {
                job_id,
                identifier: identifier.into(),
                state,
                indexed,
            },
        );
        id
    }

    /// Move a document into a new state; false if it does not exist
    pub fn set_state(&self, id: DocumentId, state: DocumentState) -> bool {
        match self.lock().documents.get_mut(&id) {
            Some(record) => {
                record.state = state;
                true
            }
            None => false,
        }
    }

    /// Forget documents a worker finished with
    pub fn mark_complete(&self, ids: &[DocumentId]) -> usize {
        let mut store = self.lock();
        ids.iter()
            .filter(|id| store.documents.remove(*id).is_some())
            .count()
    }

    pub fn state_of(&self, id: DocumentId) -> Option<DocumentState> {
        self.lock().documents.get(&id).map(|r| r.state)
    }

    pub fn count_in(&self, state: DocumentState) -> usize {
        self.lock()
            .documents
            .values()
            .filter(|r| r.state == state)
            .count()
    }

    /// Make the next fetch fail with `error`
    pub fn inject_fault(&self, error: JobStoreError) {
        self.lock().faults.push_back(error);
    }
}

impl JobStore for MemoryJobStore {
    fn max_in_clause(&self) -> usize {
        self.max_in_clause
    }

    fn fetch_and_mark(
        &self,
        kind: LifecycleKind,
        limit: usize,
    ) -> Result<Vec<DocumentDescriptor>, JobStoreError> {
        let mut store = self.lock();
        if let Some(fault) = store.faults.pop_front() {
            return Err(fault);
        }
        let pending = DocumentState::pending(kind);
        let in_flight = DocumentState::in_flight(kind);
        let limit = limit.min(self.max_in_clause);

        let mut fetched = Vec::new();
        for (id, record) in store.documents.iter_mut() {
            if fetched.len() >= limit {
                break;
            }
            if record.state != pending {
                continue;
            }
            record.state = in_flight;
            fetched.push(DocumentDescriptor::new(
                *id,
                record.job_id,
                record.identifier.clone(),
                record.indexed,
            ));
        }
        if !fetched.is_empty() {
            tracing::debug!(%kind, count = fetched.len(), "documents marked in flight");
        }
        Ok(fetched)
    }

    fn reset_in_flight(&self, kind: LifecycleKind) -> Result<usize, JobStoreError> {
        let pending = DocumentState::pending(kind);
        let in_flight = DocumentState::in_flight(kind);
        let mut store = self.lock();
        let mut reset = 0;
        for record in store.documents.values_mut() {
            if record.state == in_flight {
                record.state = pending;
                reset += 1;
            }
        }
        Ok(reset)
    }
}

impl JobLoader for MemoryJobStore {
    fn load_job(&self, id: JobId) -> Result<Option<JobDescription>, JobStoreError> {
        Ok(self.lock().jobs.get(&id).cloned())
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
