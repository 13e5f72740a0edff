// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector registration authority

use crate::{AdapterError, ConnectionKind};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// Answers whether a connector class is installed
pub trait ConnectorAuthority: Send + Sync {
    fn is_installed(&self, kind: ConnectionKind, class_name: &str) -> Result<bool, AdapterError>;
}

impl<T: ConnectorAuthority + ?Sized> ConnectorAuthority for Arc<T> {
    fn is_installed(&self, kind: ConnectionKind, class_name: &str) -> Result<bool, AdapterError> {
        (**self).is_installed(kind, class_name)
    }
}

/// Authority over an explicit list of registered classes
#[derive(Debug, Default)]
pub struct StaticAuthority {
    classes: RwLock<BTreeSet<(ConnectionKind, String)>>,
}

impl StaticAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes<I, S>(kind: ConnectionKind, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authority = Self::new();
        for class in classes {
            authority.register(kind, class);
        }
        authority
    }

    pub fn register(&self, kind: ConnectionKind, class_name: impl Into<String>) {
        self.classes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((kind, class_name.into()));
    }

    /// Returns whether the class was registered
    pub fn unregister(&self, kind: ConnectionKind, class_name: &str) -> bool {
        self.classes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(kind, class_name.to_string()))
    }
}

impl ConnectorAuthority for StaticAuthority {
    fn is_installed(&self, kind: ConnectionKind, class_name: &str) -> Result<bool, AdapterError> {
        Ok(self
            .classes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&(kind, class_name.to_string())))
    }
}
