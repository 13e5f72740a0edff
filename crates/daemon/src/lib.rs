// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trawld: hosts the connection registries, the stuffer threads and the
//! cache sweeper for an embedding worker pool

pub mod config;
pub mod lifecycle;

pub use config::{Config, ConfigError};
pub use lifecycle::{startup, Daemon, LifecycleError};
