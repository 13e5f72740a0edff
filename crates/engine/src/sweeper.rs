// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic eviction of expired cache objects

use crate::signal::StopSignal;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use trawl_core::{CacheManager, Clock};

pub struct Sweeper {
    cache: Arc<CacheManager>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    stop: StopSignal,
}

impl Sweeper {
    pub fn new(
        cache: Arc<CacheManager>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        stop: StopSignal,
    ) -> Self {
        Self {
            cache,
            clock,
            interval,
            stop,
        }
    }

    /// Expire everything past its lifetime as of now
    pub fn sweep(&self) -> usize {
        let expired = self.cache.expire_objects(self.clock.now());
        if expired > 0 {
            tracing::debug!(expired, "expired cache objects");
        }
        expired
    }

    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("cache-sweeper".to_string())
            .spawn(move || {
                while self.stop.sleep(self.interval) {
                    self.sweep();
                }
                tracing::debug!("cache sweeper stopped");
            })
    }
}
