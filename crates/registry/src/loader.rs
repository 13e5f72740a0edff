// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache executors used by registry reads

use crate::error::RegistryError;
use crate::record::ConnectionRecord;
use std::collections::HashMap;
use trawl_core::{CacheDescription, CacheExecutor};
use trawl_storage::ConnectionTable;

/// Loads connection records by name, one fetch per cache miss batch
pub(crate) struct RecordLoader<'a> {
    table: &'a dyn ConnectionTable,
    found: HashMap<String, ConnectionRecord>,
}

impl<'a> RecordLoader<'a> {
    pub fn new(table: &'a dyn ConnectionTable) -> Self {
        Self {
            table,
            found: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<ConnectionRecord> {
        self.found.get(name).cloned()
    }
}

fn record_name(description: &CacheDescription) -> String {
    description.key().parts().first().cloned().unwrap_or_default()
}

impl CacheExecutor for RecordLoader<'_> {
    type Value = ConnectionRecord;
    type Error = RegistryError;

    fn create(
        &mut self,
        missing: &[CacheDescription],
    ) -> Result<Vec<Option<ConnectionRecord>>, RegistryError> {
        let names: Vec<String> = missing.iter().map(record_name).collect();
        let mut rows = HashMap::new();
        for row in self.table.fetch(&names)? {
            let record = ConnectionRecord::from_row(row)?;
            rows.insert(record.name.clone(), record);
        }
        Ok(names
            .iter()
            .map(|name| {
                let record = rows.get(name).cloned();
                if let Some(record) = &record {
                    self.found.insert(name.clone(), record.clone());
                }
                record
            })
            .collect())
    }

    fn exists(
        &mut self,
        description: &CacheDescription,
        value: ConnectionRecord,
    ) -> Result<(), RegistryError> {
        self.found.insert(record_name(description), value);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// Produces a single derived value (a name list, a lookup) on a miss
pub(crate) struct SingleObject<V, F> {
    produce: F,
    value: Option<V>,
}

impl<V, F> SingleObject<V, F>
where
    F: FnMut() -> Result<V, RegistryError>,
{
    pub fn new(produce: F) -> Self {
        Self {
            produce,
            value: None,
        }
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }
}

impl<V, F> CacheExecutor for SingleObject<V, F>
where
    V: Clone + Send + Sync + 'static,
    F: FnMut() -> Result<V, RegistryError>,
{
    type Value = V;
    type Error = RegistryError;

    fn create(&mut self, missing: &[CacheDescription]) -> Result<Vec<Option<V>>, RegistryError> {
        let mut out = Vec::with_capacity(missing.len());
        for _ in missing {
            let value = (self.produce)()?;
            self.value = Some(value.clone());
            out.push(Some(value));
        }
        Ok(out)
    }

    fn exists(&mut self, _description: &CacheDescription, value: V) -> Result<(), RegistryError> {
        self.value = Some(value);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }
}
