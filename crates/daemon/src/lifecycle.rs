// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};
use trawl_adapters::{
    ConnectionKind, NoOpNotifier, NoReferences, StaticAuthority, TracedAuthority, TracedNotifier,
    TracedReferences,
};
use trawl_core::{CacheManager, Clock, LockManager, SystemClock, UuidIdGen};
use trawl_engine::{Scheduler, SchedulerDeps, SchedulerError, SystemExit};
use trawl_registry::{
    table_name, Collaborators, ConnectionRegistry, Coordination, RegistryError,
};
use trawl_storage::{MemoryJobStore, MemoryTable, StoreError};

use crate::config::Config;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// A running daemon
pub struct Daemon {
    config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: File,
    registries: BTreeMap<ConnectionKind, Arc<ConnectionRegistry>>,
    jobs: Arc<MemoryJobStore>,
    authority: Arc<StaticAuthority>,
    scheduler: Scheduler,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("state_dir", &self.config.store.state_dir)
            .field("registries", &self.registries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self, kind: ConnectionKind) -> Option<Arc<ConnectionRegistry>> {
        self.registries.get(&kind).cloned()
    }

    /// Job store the stuffers read from
    pub fn jobs(&self) -> Arc<MemoryJobStore> {
        Arc::clone(&self.jobs)
    }

    /// Connector classes the registries treat as installed
    pub fn authority(&self) -> Arc<StaticAuthority> {
        Arc::clone(&self.authority)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Stop the background threads and release the lock file
    pub fn shutdown(self) {
        info!("shutting down daemon");
        self.scheduler.shutdown();

        let lock_path = self.config.lock_path();
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            warn!(error = %e, "failed to release lock file");
        }
        drop(self.lock_file);
        if lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&lock_path) {
                warn!(error = %e, "failed to remove lock file");
            }
        }
        info!("daemon shutdown complete");
    }
}

/// Start the daemon
pub fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    match startup_inner(config) {
        Ok(daemon) => Ok(daemon),
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<Daemon, LifecycleError> {
    // 1. Acquire the lock file first so two daemons never share a state dir
    std::fs::create_dir_all(&config.store.state_dir)?;
    let mut lock_file = File::create(config.lock_path())?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 2. Shared coordination
    let locks = Arc::new(LockManager::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(CacheManager::new(Arc::clone(&locks), Arc::clone(&clock)));
    let coordination = Coordination {
        locks,
        cache: Arc::clone(&cache),
        ids: Arc::new(UuidIdGen),
    };

    // 3. Registries over their logged tables
    let authority = Arc::new(StaticAuthority::new());
    let collaborators = Collaborators {
        authority: Arc::new(TracedAuthority::new(Arc::clone(&authority))),
        references: Arc::new(TracedReferences::new(NoReferences)),
        notifier: Arc::new(TracedNotifier::new(NoOpNotifier)),
    };
    let mut registries = BTreeMap::new();
    for kind in ConnectionKind::ALL {
        let name = table_name(kind);
        let table = MemoryTable::open(
            name.as_str(),
            &config.store.state_dir.join(format!("{name}.wal")),
            config.store.max_in_clause,
            config.store.row_lock_timeout,
        )?;
        let registry = ConnectionRegistry::new(
            kind,
            Arc::new(table),
            coordination.clone(),
            collaborators.clone(),
            config.registry_options(),
        );
        registry.install()?;
        info!(%kind, table = %name, "registry ready");
        registries.insert(kind, Arc::new(registry));
    }

    // 4. Scheduler threads, last
    let jobs = Arc::new(MemoryJobStore::new(config.store.max_in_clause));
    let scheduler = Scheduler::start(
        &config.scheduler_config(),
        SchedulerDeps {
            store: jobs.clone(),
            loader: jobs.clone(),
            cache,
            clock,
            exit: Arc::new(SystemExit),
        },
    )?;

    info!(state_dir = %config.store.state_dir.display(), "daemon started");
    Ok(Daemon {
        config: config.clone(),
        lock_file,
        registries,
        jobs,
        authority,
        scheduler,
    })
}

/// Clean up resources on startup failure; the lock file belongs to us
/// unless acquiring it was what failed
fn cleanup_on_failure(config: &Config) {
    let lock_path = config.lock_path();
    if lock_path.exists() {
        let _ = std::fs::remove_file(&lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
