// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Read from a TOML file. Every field has a default, and a missing file
//! means all defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use trawl_engine::SchedulerConfig;
use trawl_registry::{RegistryOptions, RetryPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerSection {
    pub worker_threads: usize,
    pub max_queue_multiplier: usize,
    #[serde(with = "humantime_serde")]
    pub full_queue_poll: Duration,
    #[serde(with = "humantime_serde")]
    pub idle_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub reset_cooldown: Duration,
    #[serde(with = "humantime_serde")]
    pub expire_sweep_interval: Duration,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            worker_threads: defaults.workers,
            max_queue_multiplier: defaults.max_queue_multiplier,
            full_queue_poll: defaults.full_queue_poll,
            idle_backoff: defaults.idle_backoff,
            reset_cooldown: defaults.reset_cooldown,
            expire_sweep_interval: defaults.expire_sweep_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Holds the lock file, the table logs and by default the log file
    pub state_dir: PathBuf,
    pub max_in_clause: usize,
    #[serde(with = "humantime_serde")]
    pub row_lock_timeout: Duration,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("trawl-state"),
            max_in_clause: 200,
            row_lock_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    pub max_retry_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub retry_base_sleep: Duration,
    #[serde(with = "humantime_serde")]
    pub cache_lifetime: Option<Duration>,
    pub max_cached: Option<usize>,
}

impl Default for RegistrySection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_retry_attempts: retry.max_attempts,
            retry_base_sleep: retry.base_sleep,
            cache_lifetime: Some(Duration::from_secs(300)),
            max_cached: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scheduler: SchedulerSection,
    pub store: StoreSection,
    pub registry: RegistrySection,
    pub logging: LoggingSection,
}

impl Config {
    /// Load and validate `path`; a file that does not exist yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.worker_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.worker_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduler.max_queue_multiplier == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.max_queue_multiplier",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.store.max_in_clause == 0 {
            return Err(ConfigError::Invalid {
                field: "store.max_in_clause",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.registry.max_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "registry.max_retry_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn log_path(&self) -> PathBuf {
        self.logging
            .log_path
            .clone()
            .unwrap_or_else(|| self.store.state_dir.join("trawld.log"))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.store.state_dir.join("trawld.pid")
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        let s = &self.scheduler;
        SchedulerConfig {
            workers: s.worker_threads,
            max_queue_multiplier: s.max_queue_multiplier,
            full_queue_poll: s.full_queue_poll,
            idle_backoff: s.idle_backoff,
            reset_cooldown: s.reset_cooldown,
            expire_sweep_interval: s.expire_sweep_interval,
        }
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            retry: RetryPolicy {
                max_attempts: self.registry.max_retry_attempts,
                base_sleep: self.registry.retry_base_sleep,
            },
            cache_lifetime: self.registry.cache_lifetime,
            max_cached: self.registry.max_cached,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
