// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trawl-engine: the background threads of the lifecycle scheduler
//!
//! One stuffer thread per [`LifecycleKind`](trawl_core::LifecycleKind)
//! moves documents from the job store into that kind's queue, and a
//! sweeper expires cache objects. The [`Scheduler`] owns all of them.

mod error;
mod policy;
mod reset;
mod scheduler;
mod signal;
mod stuffer;
mod sweeper;

pub use error::{SchedulerError, StufferError};
pub use policy::{classify, FailureAction, ProcessExit, SystemExit, EXIT_RESOURCES, EXIT_SETUP};
pub use reset::{ResetManager, ResetParticipant};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerDeps};
pub use signal::StopSignal;
pub use stuffer::{Pass, Stuffer, StufferConfig};
pub use sweeper::Sweeper;
