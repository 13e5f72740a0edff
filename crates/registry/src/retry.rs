// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry of store transactions aborted for lock contention

use crate::error::RegistryError;
use std::time::Duration;

/// How often, and with what pause, an aborted write is re-run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            base_sleep: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Pause before attempt `attempt + 1`: between one and two base sleeps,
    /// spread by attempt number so colliding writers drift apart.
    pub fn pause_after(&self, attempt: u32) -> Duration {
        let spread = attempt.wrapping_mul(2_654_435_761) % 1000;
        self.base_sleep + self.base_sleep.mul_f64(f64::from(spread) / 1000.0)
    }

    /// Run `attempt` until it succeeds, fails with anything other than a
    /// transaction abort, or the attempt budget runs out.
    pub fn run<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut tries = 1;
        loop {
            match attempt() {
                Err(e) if e.is_transaction_abort() => {
                    if tries >= self.max_attempts.max(1) {
                        return Err(RegistryError::RetriesExhausted {
                            operation,
                            attempts: tries,
                            last: e.to_string(),
                        });
                    }
                    let pause = self.pause_after(tries);
                    tracing::warn!(
                        operation,
                        attempt = tries,
                        pause_ms = pause.as_millis() as u64,
                        error = %e,
                        "transaction aborted, retrying"
                    );
                    std::thread::sleep(pause);
                    tries += 1;
                }
                other => return other,
            }
        }
    }
}
