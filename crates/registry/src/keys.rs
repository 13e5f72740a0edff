// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock names, cache keys and table names per connection kind

use trawl_adapters::ConnectionKind;
use trawl_core::{CacheClass, CacheDescription, ObjectKey};
use std::time::Duration;

/// Store table holding connections of `kind`
pub fn table_name(kind: ConnectionKind) -> String {
    format!("{}connections", kind.name())
}

#[derive(Clone, Debug)]
pub(crate) struct KindKeys {
    /// Lock guarding "all connections of this kind"
    pub lock: String,
    /// Invalidation key for the connection list
    pub list: String,
    record_prefix: String,
    record_tag: String,
    names_tag: String,
    by_class_tag: String,
    class: CacheClass,
    lifetime: Option<Duration>,
}

impl KindKeys {
    pub fn new(kind: ConnectionKind, lifetime: Option<Duration>, max_cached: Option<usize>) -> Self {
        let kind = kind.name();
        Self {
            lock: format!("{}_CONNECTIONS_LOCK", kind.to_uppercase()),
            list: format!("{kind}-connections"),
            record_prefix: format!("{kind}-connection:"),
            record_tag: format!("{kind}-connection"),
            names_tag: format!("{kind}-connection-names"),
            by_class_tag: format!("{kind}-connections-by-class"),
            class: CacheClass::new(format!("{kind}-connection"), max_cached),
            lifetime,
        }
    }

    /// Invalidation key for one connection
    pub fn record(&self, name: &str) -> String {
        format!("{}{name}", self.record_prefix)
    }

    fn expiring(&self, description: CacheDescription) -> CacheDescription {
        match self.lifetime {
            Some(lifetime) => description.with_lifetime(lifetime),
            None => description,
        }
    }

    pub fn record_description(&self, name: &str) -> CacheDescription {
        let key = ObjectKey::new(self.record_tag.as_str(), [name]);
        self.expiring(CacheDescription::new(key, [self.record(name)]).with_class(self.class.clone()))
    }

    pub fn names_description(&self) -> CacheDescription {
        let key = ObjectKey::new(self.names_tag.as_str(), std::iter::empty::<String>());
        self.expiring(CacheDescription::new(key, [self.list.as_str()]))
    }

    pub fn by_class_description(&self, class_name: &str) -> CacheDescription {
        let key = ObjectKey::new(self.by_class_tag.as_str(), [class_name]);
        self.expiring(CacheDescription::new(key, [self.list.as_str()]))
    }
}
