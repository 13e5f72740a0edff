// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection records and their configuration parameters

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trawl_storage::ConnectionRow;

/// Connector-specific configuration, stored as an opaque blob
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigParams(BTreeMap<String, String>);

impl ConfigParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialized form stored in the config column
    pub fn to_blob(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Parse a stored blob. The empty blob is an empty configuration.
    pub fn from_blob(blob: &str) -> Result<Self, serde_json::Error> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(blob).map(Self)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A named connector configuration
///
/// `is_new` marks a record that was never persisted; saving it inserts a
/// row and fails if the name is already taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub is_new: bool,
    pub name: String,
    pub description: Option<String>,
    pub class_name: String,
    pub max_connections: i32,
    pub config: ConfigParams,
}

impl Default for ConnectionRecord {
    fn default() -> Self {
        Self {
            is_new: true,
            name: String::new(),
            description: None,
            class_name: String::new(),
            max_connections: 10,
            config: ConfigParams::default(),
        }
    }
}

impl ConnectionRecord {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_connections(mut self, max: i32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_config(mut self, config: ConfigParams) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn from_row(row: ConnectionRow) -> Result<Self, RegistryError> {
        let config = ConfigParams::from_blob(&row.config).map_err(|source| {
            RegistryError::CorruptConfig {
                name: row.name.clone(),
                source,
            }
        })?;
        Ok(Self {
            is_new: false,
            name: row.name,
            description: row.description,
            class_name: row.class_name,
            max_connections: row.max_count,
            config,
        })
    }

    pub(crate) fn to_row(&self) -> ConnectionRow {
        ConnectionRow {
            name: self.name.clone(),
            description: self.description.clone(),
            class_name: self.class_name.clone(),
            max_count: self.max_connections,
            config: self.config.to_blob(),
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
