// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache identity of an object

use crate::lock::SectionKey;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Section tag prefix for cache creation sections
const SECTION_TAG_PREFIX: &str = "cache:";

/// Logical identity of a cached object: a type tag plus identity fields
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    tag: String,
    parts: Vec<String>,
}

impl ObjectKey {
    pub fn new<I, S>(tag: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag: tag.into(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Critical section serializing creation of this object
    pub fn section_key(&self) -> SectionKey {
        SectionKey::new(
            format!("{SECTION_TAG_PREFIX}{}", self.tag),
            self.parts.iter().cloned(),
        )
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:?}", self.tag, self.parts)
    }
}

/// LRU class an object belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheClass {
    pub name: String,
    /// Most objects of this class kept at once; `None` is unbounded
    pub max_lru_count: Option<usize>,
}

impl CacheClass {
    pub fn new(name: impl Into<String>, max_lru_count: Option<usize>) -> Self {
        Self {
            name: name.into(),
            max_lru_count,
        }
    }
}

/// How an object is cached
///
/// Equality and hashing use the [`ObjectKey`] alone. A description without
/// invalidation keys is uncacheable: the object is created on every request
/// and never stored.
#[derive(Clone, Debug)]
pub struct CacheDescription {
    key: ObjectKey,
    invalidation_keys: Option<BTreeSet<String>>,
    lifetime: Option<Duration>,
    /// Fixed by the first call to [`expiration_time`](Self::expiration_time)
    expires_at: OnceLock<Instant>,
    class: Option<CacheClass>,
}

impl CacheDescription {
    /// Cacheable object invalidated through any of `keys`
    pub fn new<I, S>(key: ObjectKey, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key,
            invalidation_keys: Some(keys.into_iter().map(Into::into).collect()),
            lifetime: None,
            expires_at: OnceLock::new(),
            class: None,
        }
    }

    pub fn uncached(key: ObjectKey) -> Self {
        Self {
            key,
            invalidation_keys: None,
            lifetime: None,
            expires_at: OnceLock::new(),
            class: None,
        }
    }

    /// Expire the object `lifetime` after this description is first used
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_class(mut self, class: CacheClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn invalidation_keys(&self) -> Option<&BTreeSet<String>> {
        self.invalidation_keys.as_ref()
    }

    pub fn is_cacheable(&self) -> bool {
        self.invalidation_keys.is_some()
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }

    /// Absolute expiration of the described object
    ///
    /// Computed from `now` on the first call and fixed thereafter, so every
    /// save or lookup through this description agrees on one deadline.
    pub fn expiration_time(&self, now: Instant) -> Option<Instant> {
        let lifetime = self.lifetime?;
        Some(*self.expires_at.get_or_init(|| now + lifetime))
    }

    pub fn class(&self) -> Option<&CacheClass> {
        self.class.as_ref()
    }

    pub fn section_key(&self) -> SectionKey {
        self.key.section_key()
    }
}

impl PartialEq for CacheDescription {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CacheDescription {}

impl Hash for CacheDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
