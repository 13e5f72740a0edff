// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change notifications routed to the job manager

use crate::{AdapterError, ConnectionKind};
use std::sync::Arc;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifier, NotifyCall};

/// Told when a saved connection's configuration materially changed
pub trait ChangeNotifier: Send + Sync {
    fn connection_changed(&self, kind: ConnectionKind, name: &str) -> Result<(), AdapterError>;
}

impl<T: ChangeNotifier + ?Sized> ChangeNotifier for Arc<T> {
    fn connection_changed(&self, kind: ConnectionKind, name: &str) -> Result<(), AdapterError> {
        (**self).connection_changed(kind, name)
    }
}

/// Notifier that drops every notification
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifier;

impl ChangeNotifier for NoOpNotifier {
    fn connection_changed(&self, _kind: ConnectionKind, _name: &str) -> Result<(), AdapterError> {
        Ok(())
    }
}
