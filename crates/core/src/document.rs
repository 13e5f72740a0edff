// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Documents, jobs and the single-job batches handed to workers

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Identifies a crawl job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one document row in the job store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end-of-life transition a document is going through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleKind {
    /// The owning job is being deleted
    Delete,
    /// The document vanished from the repository and must leave the index
    Cleanup,
    /// The document outlived the job's expiration interval
    Expire,
}

impl LifecycleKind {
    pub const ALL: [LifecycleKind; 3] = [
        LifecycleKind::Delete,
        LifecycleKind::Cleanup,
        LifecycleKind::Expire,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleKind::Delete => "delete",
            LifecycleKind::Cleanup => "cleanup",
            LifecycleKind::Expire => "expire",
        }
    }
}

impl std::fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a worker needs to know about the job that owns a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub id: JobId,
    pub description: String,
    /// Repository connection the job crawls
    pub repository_connection: String,
    /// Output connection documents are indexed into
    pub output_connection: String,
}

impl JobDescription {
    pub fn new(
        id: JobId,
        description: impl Into<String>,
        repository_connection: impl Into<String>,
        output_connection: impl Into<String>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            repository_connection: repository_connection.into(),
            output_connection: output_connection.into(),
        }
    }

    /// Locality bins for work belonging to this job
    pub fn bins(&self) -> Vec<String> {
        let mut bins = vec![self.repository_connection.clone()];
        if self.output_connection != self.repository_connection {
            bins.push(self.output_connection.clone());
        }
        bins
    }
}

/// One document instance in a terminal lifecycle state
///
/// Never mutated once produced; a retry produces a fresh descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub id: DocumentId,
    pub job_id: JobId,
    /// Repository-specific document identifier
    pub identifier: String,
    /// Whether the output stage should drop the document from its index
    pub remove_from_index: bool,
}

impl DocumentDescriptor {
    pub fn new(
        id: DocumentId,
        job_id: JobId,
        identifier: impl Into<String>,
        remove_from_index: bool,
    ) -> Self {
        Self {
            id,
            job_id,
            identifier: identifier.into(),
            remove_from_index,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch for job {expected} cannot hold document {document} of job {found}")]
    ForeignDocument {
        document: DocumentId,
        expected: JobId,
        found: JobId,
    },
    #[error("batch for job {0} has no documents")]
    Empty(JobId),
}

/// Queued unit of work: documents of exactly one job
#[derive(Clone, Debug)]
pub struct DocumentBatch {
    kind: LifecycleKind,
    job: Arc<JobDescription>,
    documents: Vec<DocumentDescriptor>,
}

impl DocumentBatch {
    /// Build a batch, rejecting documents that belong to another job
    pub fn new(
        kind: LifecycleKind,
        job: Arc<JobDescription>,
        documents: Vec<DocumentDescriptor>,
    ) -> Result<Self, BatchError> {
        if documents.is_empty() {
            return Err(BatchError::Empty(job.id));
        }
        if let Some(doc) = documents.iter().find(|d| d.job_id != job.id) {
            return Err(BatchError::ForeignDocument {
                document: doc.id,
                expected: job.id,
                found: doc.job_id,
            });
        }
        Ok(Self {
            kind,
            job,
            documents,
        })
    }

    pub fn kind(&self) -> LifecycleKind {
        self.kind
    }

    pub fn job(&self) -> &JobDescription {
        &self.job
    }

    pub fn documents(&self) -> &[DocumentDescriptor] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn bins(&self) -> Vec<String> {
        self.job.bins()
    }

    pub fn into_documents(self) -> Vec<DocumentDescriptor> {
        self.documents
    }
}
