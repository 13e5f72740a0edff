// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graduated failure policy of the stuffer loop

use crate::error::StufferError;
use trawl_core::JobStoreError;

/// Exit code when setup is broken
pub const EXIT_SETUP: i32 = 1;
/// Exit code when the process ran out of resources
pub const EXIT_RESOURCES: i32 = -200;

/// What the stuffer loop does with a failed pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureAction {
    /// Interrupted: leave the loop quietly
    Exit,
    /// Store connectivity lost: signal a reset, cool down, resume
    ResetAndCooldown,
    /// Setup is invalid: terminate the process
    Fatal,
    /// Out of resources: terminate the process at once
    Abort,
    /// Anything else: log it and run the next pass
    LogAndContinue,
}

pub fn classify(error: &StufferError) -> FailureAction {
    match error {
        StufferError::Store(JobStoreError::Interrupted) => FailureAction::Exit,
        StufferError::Store(JobStoreError::ConnectionLost(_)) => FailureAction::ResetAndCooldown,
        StufferError::Store(JobStoreError::Setup(_)) => FailureAction::Fatal,
        StufferError::Store(JobStoreError::ResourceExhausted(_)) => FailureAction::Abort,
        StufferError::Store(JobStoreError::Other(_)) | StufferError::Batch(_) => {
            FailureAction::LogAndContinue
        }
    }
}

/// Terminates the process on fatal failures
pub trait ProcessExit: Send + Sync {
    fn exit(&self, code: i32);
}

/// Calls [`std::process::exit`]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemExit;

impl ProcessExit for SystemExit {
    fn exit(&self, code: i32) {
        tracing::error!(code, "terminating process");
        std::process::exit(code);
    }
}
