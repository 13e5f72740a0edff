// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::record::ConfigParams;
use crate::test_fixtures::{fixture, fixture_with, TIKA};
use trawl_adapters::AdapterError;
use trawl_storage::{ConnectionTable, StoreError};

const KIND: ConnectionKind = ConnectionKind::Transformation;

fn record(name: &str) -> ConnectionRecord {
    ConnectionRecord::new(name, TIKA)
        .with_config([("timeout", "30")].into_iter().collect::<ConfigParams>())
}

fn saved(registry: &ConnectionRegistry, name: &str) -> ConnectionRecord {
    registry.save(&record(name)).unwrap();
    registry.load(name).unwrap().unwrap()
}

// === Save ===

#[test]
fn saving_a_new_record_inserts_it() {
    let f = fixture(KIND);
    assert!(f.registry.save(&record("tika")).unwrap());

    let loaded = f.registry.load("tika").unwrap().unwrap();
    assert!(!loaded.is_new);
    assert_eq!(loaded.class_name, TIKA);
    assert_eq!(loaded.config.get("timeout"), Some("30"));
    assert_eq!(f.table.row_count(), 1);
}

#[test]
fn new_record_with_taken_name_is_refused() {
    let f = fixture(KIND);
    f.registry.save(&record("tika")).unwrap();

    let err = f.registry.save(&record("tika")).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyExists { ref name, .. } if name == "tika"));
}

#[test]
fn updating_a_vanished_record_is_refused() {
    let f = fixture(KIND);
    let loaded = saved(&f.registry, "tika");
    assert!(f.registry.delete("tika").unwrap());

    let err = f.registry.save(&loaded).unwrap_err();
    assert!(matches!(err, RegistryError::NoLongerExists { .. }));
    assert_eq!(f.table.row_count(), 0);
}

#[test]
fn update_returns_false_and_is_visible_to_next_load() {
    let f = fixture(KIND);
    let mut loaded = saved(&f.registry, "tika");
    loaded.max_connections = 3;

    assert!(!f.registry.save(&loaded).unwrap());
    assert_eq!(f.registry.load("tika").unwrap().unwrap().max_connections, 3);
}

// === Change notification ===

#[test]
fn config_change_notifies_once() {
    let f = fixture(KIND);
    let mut loaded = saved(&f.registry, "tika");
    assert!(f.notifier.calls().is_empty());

    loaded.config.set("timeout", "60");
    f.registry.save(&loaded).unwrap();
    assert_eq!(f.notifier.count_for("tika"), 1);
    assert_eq!(f.notifier.calls()[0].kind, KIND);
}

#[test]
fn identical_save_does_not_notify() {
    let f = fixture(KIND);
    let loaded = saved(&f.registry, "tika");

    f.registry.save(&loaded).unwrap();
    f.registry.save(&loaded).unwrap();
    assert!(f.notifier.calls().is_empty());
}

#[test]
fn description_change_does_not_notify() {
    let f = fixture(KIND);
    let loaded = saved(&f.registry, "tika").with_description("renamed");

    f.registry.save(&loaded).unwrap();
    assert!(f.notifier.calls().is_empty());
}

// === Delete ===

#[test]
fn referenced_connection_cannot_be_deleted() {
    let f = fixture(KIND);
    saved(&f.registry, "tika");
    f.references.reference(KIND, "tika");

    let err = f.registry.delete("tika").unwrap_err();
    assert!(matches!(err, RegistryError::InUse { .. }));
    assert!(f.registry.load("tika").unwrap().is_some());

    f.references.unreference(KIND, "tika");
    assert!(f.registry.delete("tika").unwrap());
    assert!(f.registry.load("tika").unwrap().is_none());
}

#[test]
fn references_are_checked_per_kind() {
    let f = fixture(KIND);
    saved(&f.registry, "tika");
    f.references.reference(ConnectionKind::Notification, "tika");

    assert!(f.registry.delete("tika").unwrap());
    assert_eq!(f.references.checks(), vec![(KIND, "tika".to_string())]);
}

#[test]
fn deleting_a_missing_connection_is_not_an_error() {
    let f = fixture(KIND);
    assert!(!f.registry.delete("ghost").unwrap());
}

#[test]
fn reference_check_failure_aborts_delete() {
    let f = fixture(KIND);
    saved(&f.registry, "tika");
    f.references.fail_with(Some(AdapterError::Unavailable("job store".into())));

    let err = f.registry.delete("tika").unwrap_err();
    assert!(matches!(err, RegistryError::Collaborator(AdapterError::Unavailable(_))));
    assert_eq!(f.table.row_count(), 1);
}

// === Reads ===

#[test]
fn all_connections_are_ordered_ignoring_case() {
    let f = fixture(KIND);
    for name in ["beta", "Alpha", "gamma", "Delta"] {
        f.registry.save(&record(name)).unwrap();
    }

    let names: Vec<String> = f
        .registry
        .get_all_connections()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "beta", "Delta", "gamma"]);
}

#[test]
fn cached_list_sees_later_writes() {
    let f = fixture(KIND);
    f.registry.save(&record("a")).unwrap();
    assert_eq!(f.registry.get_all_connections().unwrap().len(), 1);

    f.registry.save(&record("b")).unwrap();
    assert_eq!(f.registry.get_all_connections().unwrap().len(), 2);

    f.registry.delete("a").unwrap();
    let all = f.registry.get_all_connections().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "b");
}

#[test]
fn loads_are_served_from_cache() {
    let f = fixture(KIND);
    saved(&f.registry, "tika");
    let before = f.cache.cached_count();

    f.registry.load("tika").unwrap();
    assert_eq!(f.cache.cached_count(), before);
    assert!(f.cache.is_cached(f.registry.keys.record_description("tika").key()));
}

#[test]
fn loaded_records_are_private_copies() {
    let f = fixture(KIND);
    let mut first = saved(&f.registry, "tika");
    first.config.set("timeout", "999");

    let second = f.registry.load("tika").unwrap().unwrap();
    assert_eq!(second.config.get("timeout"), Some("30"));
}

#[test]
fn load_multiple_chunks_and_aligns_results() {
    let f = fixture_with(KIND, 2);
    for name in ["a", "b", "c", "d"] {
        f.registry.save(&record(name)).unwrap();
    }
    let names: Vec<String> = ["d", "missing", "a", "c", "b"].iter().map(|s| s.to_string()).collect();

    let loaded = f.registry.load_multiple(&names).unwrap();
    let found: Vec<Option<&str>> = loaded.iter().map(|r| r.as_ref().map(|r| r.name.as_str())).collect();
    assert_eq!(found, vec![Some("d"), None, Some("a"), Some("c"), Some("b")]);
}

#[test]
fn missing_connections_are_not_cached() {
    let f = fixture(KIND);
    assert!(f.registry.load("later").unwrap().is_none());

    f.registry.save(&record("later")).unwrap();
    assert!(f.registry.load("later").unwrap().is_some());
}

#[test]
fn connections_for_connector_are_sorted_and_refreshed() {
    let f = fixture(KIND);
    f.registry.save(&record("b")).unwrap();
    f.registry.save(&ConnectionRecord::new("other", "org.example.Other")).unwrap();
    f.registry.save(&record("a")).unwrap();
    assert_eq!(f.registry.find_connections_for_connector(TIKA).unwrap(), vec!["a", "b"]);

    f.registry.save(&record("c")).unwrap();
    assert_eq!(
        f.registry.find_connections_for_connector(TIKA).unwrap(),
        vec!["a", "b", "c"]
    );
    assert!(f.registry.find_connections_for_connector("nope").unwrap().is_empty());
}

#[test]
fn connector_existence_follows_the_authority() {
    let f = fixture(KIND);
    saved(&f.registry, "tika");
    assert!(f.registry.check_connector_exists("tika").unwrap());

    f.authority.unregister(KIND, TIKA);
    assert!(!f.registry.check_connector_exists("tika").unwrap());
}

#[test]
fn connector_check_of_unknown_connection_fails() {
    let f = fixture(KIND);
    let err = f.registry.check_connector_exists("ghost").unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { ref name, .. } if name == "ghost"));
}

#[test]
fn create_returns_an_unsaved_record() {
    let f = fixture(KIND);
    let fresh = f.registry.create();
    assert!(fresh.is_new);
    assert!(fresh.name.is_empty());
    assert_eq!(f.registry.connection_name_column(), "connectionname");
}

// === Retry ===

#[test]
fn aborted_save_is_retried_transparently() {
    let f = fixture(KIND);
    f.table.inject_transaction_aborts(2);

    assert!(f.registry.save(&record("tika")).unwrap());
    assert_eq!(f.table.row_count(), 1);
}

#[test]
fn aborted_retries_leave_no_partial_state() {
    let f = fixture(KIND);
    f.table.inject_transaction_aborts(5);

    let err = f.registry.save(&record("tika")).unwrap_err();
    assert!(matches!(err, RegistryError::RetriesExhausted { operation: "save", attempts: 5, .. }));
    assert_eq!(f.table.row_count(), 0);
    assert!(f.registry.load("tika").unwrap().is_none());

    assert!(f.registry.save(&record("tika")).unwrap());
}

#[test]
fn aborted_delete_is_retried() {
    let f = fixture(KIND);
    saved(&f.registry, "tika");
    f.table.inject_transaction_aborts(1);

    assert!(f.registry.delete("tika").unwrap());
    assert!(f.registry.load("tika").unwrap().is_none());
}

// === Schema ===

#[test]
fn install_is_idempotent() {
    let f = fixture(KIND);
    let before = f.table.indexes().unwrap();
    f.registry.install().unwrap();
    assert_eq!(f.table.indexes().unwrap(), before);
    assert_eq!(before.len(), 2);
    assert!(before.iter().any(|i| i.is_primary()));
}

#[test]
fn install_drops_stray_indexes() {
    let f = fixture(KIND);
    f.table
        .add_index(IndexDescription::new("stray", true, &[columns::DESCRIPTION]))
        .unwrap();
    f.table
        .add_index(IndexDescription::new("second_class", false, &[columns::CLASS_NAME]))
        .unwrap();

    f.registry.install().unwrap();
    let names: Vec<String> = f.table.indexes().unwrap().into_iter().map(|i| i.name).collect();
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"stray".to_string()));
}

#[test]
fn deinstall_removes_the_table() {
    let f = fixture(KIND);
    f.registry.deinstall().unwrap();
    assert!(!f.table.is_installed());
    f.registry.deinstall().unwrap();

    let err = f.registry.save(&record("tika")).unwrap_err();
    assert!(matches!(err, RegistryError::Store(StoreError::TableMissing(_))));
}
