// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry wired to in-memory collaborators

use crate::registry::{Collaborators, ConnectionRegistry, Coordination, RegistryOptions};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use trawl_adapters::{ConnectionKind, FakeNotifier, FakeReferences, StaticAuthority};
use trawl_core::{CacheManager, LockManager, SequentialIdGen, SystemClock};
use trawl_storage::MemoryTable;

pub(crate) const TIKA: &str = "org.example.TikaExtractor";

pub(crate) struct Fixture {
    pub registry: ConnectionRegistry,
    pub table: Arc<MemoryTable>,
    pub cache: Arc<CacheManager>,
    pub authority: Arc<StaticAuthority>,
    pub references: FakeReferences,
    pub notifier: FakeNotifier,
}

pub(crate) fn fixture(kind: ConnectionKind) -> Fixture {
    fixture_with(kind, 50)
}

pub(crate) fn fixture_with(kind: ConnectionKind, max_in_clause: usize) -> Fixture {
    let table = Arc::new(MemoryTable::new(
        crate::table_name(kind),
        max_in_clause,
        Duration::from_secs(2),
    ));
    let locks = Arc::new(LockManager::new());
    let cache = Arc::new(CacheManager::new(Arc::clone(&locks), Arc::new(SystemClock)));
    let authority = Arc::new(StaticAuthority::with_classes(kind, [TIKA]));
    let references = FakeReferences::new();
    let notifier = FakeNotifier::new();

    let registry = ConnectionRegistry::new(
        kind,
        table.clone(),
        Coordination {
            locks,
            cache: Arc::clone(&cache),
            ids: Arc::new(SequentialIdGen::new("txn")),
        },
        Collaborators {
            authority: authority.clone(),
            references: Arc::new(references.clone()),
            notifier: Arc::new(notifier.clone()),
        },
        RegistryOptions {
            retry: RetryPolicy {
                max_attempts: 5,
                base_sleep: Duration::from_millis(1),
            },
            ..RegistryOptions::default()
        },
    );
    registry.install().unwrap();

    Fixture {
        registry,
        table,
        cache,
        authority,
        references,
        notifier,
    }
}
