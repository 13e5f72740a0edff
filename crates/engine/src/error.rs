// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler threads

use thiserror::Error;
use trawl_core::{BatchError, JobStoreError};

/// Failure of one stuffer pass
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StufferError {
    #[error("job store: {0}")]
    Store(#[from] JobStoreError),
    #[error("batch: {0}")]
    Batch(#[from] BatchError),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn {thread}: {source}")]
    Spawn {
        thread: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scheduler configuration: {0}")]
    Config(String),
}
