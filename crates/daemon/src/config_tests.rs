// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn empty_file_means_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.scheduler.worker_threads, 10);
    assert_eq!(config.scheduler_config().queue_capacity(), 30);
    assert_eq!(config.store.max_in_clause, 200);
    assert_eq!(config.registry.cache_lifetime, Some(Duration::from_secs(300)));
    config.validate().unwrap();
}

#[test]
fn durations_are_human_readable() {
    let config = Config::parse(
        r#"
        [scheduler]
        worker_threads = 4
        full_queue_poll = "250ms"
        reset_cooldown = "1m"

        [registry]
        retry_base_sleep = "20ms"
        cache_lifetime = "10s"
        "#,
    )
    .unwrap();
    assert_eq!(config.scheduler.worker_threads, 4);
    assert_eq!(config.scheduler.full_queue_poll, Duration::from_millis(250));
    assert_eq!(config.scheduler.reset_cooldown, Duration::from_secs(60));
    assert_eq!(config.scheduler.idle_backoff, Duration::from_secs(1));

    let options = config.registry_options();
    assert_eq!(options.retry.base_sleep, Duration::from_millis(20));
    assert_eq!(options.retry.max_attempts, 20);
    assert_eq!(options.cache_lifetime, Some(Duration::from_secs(10)));
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(Config::parse("[scheduler]\nworkers = 3\n").is_err());
}

#[parameterized(
    zero_workers = { "[scheduler]\nworker_threads = 0", "scheduler.worker_threads" },
    zero_multiplier = { "[scheduler]\nmax_queue_multiplier = 0", "scheduler.max_queue_multiplier" },
    zero_in_clause = { "[store]\nmax_in_clause = 0", "store.max_in_clause" },
    zero_attempts = { "[registry]\nmax_retry_attempts = 0", "registry.max_retry_attempts" },
)]
fn invalid_values_are_setup_errors(text: &str, expected: &str) {
    let err = Config::parse(text).unwrap().validate().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field, .. } if field == expected));
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn unparsable_file_names_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trawld.toml");
    std::fs::write(&path, "[scheduler\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if p == &path));
}

#[test]
fn paths_derive_from_state_dir() {
    let mut config = Config::default();
    config.store.state_dir = PathBuf::from("/var/lib/trawl");
    assert_eq!(config.lock_path(), PathBuf::from("/var/lib/trawl/trawld.pid"));
    assert_eq!(config.log_path(), PathBuf::from("/var/lib/trawl/trawld.log"));

    config.logging.log_path = Some(PathBuf::from("/var/log/trawld.log"));
    assert_eq!(config.log_path(), PathBuf::from("/var/log/trawld.log"));
}
