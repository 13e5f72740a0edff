// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trawl-registry: persisted registries of named connector configurations
//!
//! One [`ConnectionRegistry`] per [`ConnectionKind`](trawl_adapters::ConnectionKind).
//! Reads go through the shared cache; writes run as store transactions
//! under the kind's non-exclusive write lock and are retried from scratch
//! when the store aborts them for lock contention.

mod error;
mod export;
mod keys;
mod loader;
mod record;
mod registry;
mod retry;

pub use error::RegistryError;
pub use export::EXPORT_VERSION;
pub use keys::table_name;
pub use record::{ConfigParams, ConnectionRecord};
pub use registry::{Collaborators, ConnectionRegistry, Coordination, RegistryOptions};
pub use retry::RetryPolicy;

#[cfg(test)]
mod test_fixtures;
