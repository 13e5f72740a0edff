// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced collaborator wrappers for consistent observability

use crate::authority::ConnectorAuthority;
use crate::notifier::ChangeNotifier;
use crate::references::ReferenceChecker;
use crate::{AdapterError, ConnectionKind};
use std::time::Instant;

/// Wrapper that adds tracing to any ConnectorAuthority
#[derive(Clone, Debug)]
pub struct TracedAuthority<A> {
    inner: A,
}

impl<A> TracedAuthority<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: ConnectorAuthority> ConnectorAuthority for TracedAuthority<A> {
    fn is_installed(&self, kind: ConnectionKind, class_name: &str) -> Result<bool, AdapterError> {
        let span = tracing::info_span!("authority.is_installed", %kind, class_name);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.is_installed(kind, class_name);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(installed) => tracing::debug!(installed, elapsed_ms, "connector lookup"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "connector lookup failed"),
        }
        result
    }
}

/// Wrapper that adds tracing to any ReferenceChecker
#[derive(Clone, Debug)]
pub struct TracedReferences<R> {
    inner: R,
}

impl<R> TracedReferences<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: ReferenceChecker> ReferenceChecker for TracedReferences<R> {
    fn is_connection_in_use(&self, kind: ConnectionKind, name: &str) -> Result<bool, AdapterError> {
        let span = tracing::info_span!("references.check", %kind, name);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.is_connection_in_use(kind, name);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(in_use) => tracing::debug!(in_use, elapsed_ms, "checked"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "reference check failed"),
        }
        result
    }
}

/// Wrapper that adds tracing to any ChangeNotifier
#[derive(Clone, Debug)]
pub struct TracedNotifier<N> {
    inner: N,
}

impl<N> TracedNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

impl<N: ChangeNotifier> ChangeNotifier for TracedNotifier<N> {
    fn connection_changed(&self, kind: ConnectionKind, name: &str) -> Result<(), AdapterError> {
        let span = tracing::info_span!("notify.connection_changed", %kind, name);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.connection_changed(kind, name);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::info!(elapsed_ms, "change notified"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "change notification failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
