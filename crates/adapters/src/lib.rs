// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Collaborators the connection registries consult

pub mod authority;
pub mod kind;
pub mod notifier;
pub mod references;
pub mod traced;

use thiserror::Error;

pub use authority::{ConnectorAuthority, StaticAuthority};
pub use kind::ConnectionKind;
pub use notifier::{ChangeNotifier, NoOpNotifier};
pub use references::{NoReferences, ReferenceChecker};
pub use traced::{TracedAuthority, TracedNotifier, TracedReferences};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notifier::{FakeNotifier, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use references::FakeReferences;

/// Failure reported by an external collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator failed: {0}")]
    Failed(String),
}
