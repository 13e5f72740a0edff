// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::{mpsc, Arc};
use std::thread;

fn row(name: &str, config: &str) -> ConnectionRow {
    ConnectionRow {
        name: name.to_string(),
        description: None,
        class_name: "org.example.Tika".to_string(),
        max_count: 5,
        config: config.to_string(),
    }
}

fn installed(timeout: Duration) -> MemoryTable {
    let table = MemoryTable::new("transformconnections", 3, timeout);
    table.create_table().unwrap();
    table
}

fn insert(table: &MemoryTable, name: &str, config: &str) {
    let mut txn = table.begin().unwrap();
    txn.insert(row(name, config)).unwrap();
    txn.commit().unwrap();
}

#[test]
fn uninstalled_table_rejects_access() {
    let table = MemoryTable::new("t", 10, Duration::from_secs(1));
    assert!(!table.is_installed());
    assert!(matches!(table.list_names(), Err(StoreError::TableMissing(_))));
    assert!(table.begin().is_err());
}

#[test]
fn create_table_adds_primary_key_index() {
    let table = installed(Duration::from_secs(1));
    let indexes = table.indexes().unwrap();
    assert_eq!(indexes.len(), 1);
    assert!(indexes[0].is_primary());
    assert_eq!(indexes[0].columns, vec![columns::NAME.to_string()]);
}

#[test]
fn commit_publishes_buffered_writes() {
    let table = installed(Duration::from_secs(1));
    let mut txn = table.begin().unwrap();
    txn.insert(row("a", "1")).unwrap();
    assert!(table.list_names().unwrap().is_empty());
    assert_eq!(txn.select_for_update("a").unwrap().unwrap().config, "1");
    txn.commit().unwrap();
    assert_eq!(table.list_names().unwrap(), vec!["a".to_string()]);
}

#[test]
fn rollback_discards_writes() {
    let table = installed(Duration::from_secs(1));
    insert(&table, "a", "1");
    let mut txn = table.begin().unwrap();
    txn.update(row("a", "2")).unwrap();
    assert!(txn.delete("a").unwrap());
    txn.rollback();
    assert_eq!(table.fetch(&["a".to_string()]).unwrap()[0].config, "1");
}

#[test]
fn insert_of_existing_row_is_duplicate() {
    let table = installed(Duration::from_secs(1));
    insert(&table, "a", "1");
    let mut txn = table.begin().unwrap();
    assert!(matches!(
        txn.insert(row("a", "2")),
        Err(StoreError::DuplicateKey(name)) if name == "a"
    ));
    assert!(matches!(txn.update(row("b", "2")), Err(StoreError::RowMissing(_))));
}

#[test]
fn fetch_honors_in_clause_limit() {
    let table = installed(Duration::from_secs(1));
    insert(&table, "a", "1");
    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    assert!(matches!(
        table.fetch(&names),
        Err(StoreError::TooManyKeys { count: 4, limit: 3 })
    ));
    let rows = table.fetch(&names[..3]).unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn find_by_class_filters_rows() {
    let table = installed(Duration::from_secs(1));
    insert(&table, "a", "1");
    let mut txn = table.begin().unwrap();
    let mut other = row("b", "1");
    other.class_name = "org.example.Other".to_string();
    txn.insert(other).unwrap();
    txn.commit().unwrap();
    assert_eq!(table.find_by_class("org.example.Tika").unwrap(), vec!["a".to_string()]);
}

#[test]
fn contended_row_lock_times_out_as_abort() {
    let table = Arc::new(installed(Duration::from_millis(50)));
    let (locked_tx, locked_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let holder = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            let mut txn = table.begin().unwrap();
            txn.select_for_update("a").unwrap();
            locked_tx.send(()).unwrap();
            done_rx.recv().unwrap();
        })
    };

    locked_rx.recv().unwrap();
    let mut txn = table.begin().unwrap();
    let err = txn.select_for_update("a").unwrap_err();
    assert!(err.is_transaction_abort());
    drop(txn);
    done_tx.send(()).unwrap();
    holder.join().unwrap();

    let mut txn = table.begin().unwrap();
    assert!(txn.select_for_update("a").unwrap().is_none());
}

#[test]
fn waiting_transaction_proceeds_when_row_is_released() {
    let table = Arc::new(installed(Duration::from_secs(5)));
    let mut first = table.begin().unwrap();
    first.insert(row("a", "1")).unwrap();

    let waiter = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            let mut txn = table.begin().unwrap();
            txn.select_for_update("a").unwrap().map(|r| r.config)
        })
    };
    thread::sleep(Duration::from_millis(30));
    first.commit().unwrap();
    assert_eq!(waiter.join().unwrap(), Some("1".to_string()));
}

#[test]
fn injected_abort_fails_one_commit() {
    let table = installed(Duration::from_secs(1));
    table.inject_transaction_aborts(1);
    let mut txn = table.begin().unwrap();
    txn.insert(row("a", "1")).unwrap();
    assert!(txn.commit().unwrap_err().is_transaction_abort());
    assert_eq!(table.row_count(), 0);
    insert(&table, "a", "1");
    assert_eq!(table.row_count(), 1);
}

#[test]
fn durable_table_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.wal");
    {
        let table = MemoryTable::open("t", &path, 10, Duration::from_secs(1)).unwrap();
        table.create_table().unwrap();
        insert(&table, "a", "1");
        table
            .add_index(IndexDescription::new("t_class", false, &[columns::CLASS_NAME]))
            .unwrap();
        let mut txn = table.begin().unwrap();
        txn.delete("a").unwrap();
        txn.insert(row("b", "2")).unwrap();
        txn.commit().unwrap();
    }
    let table = MemoryTable::open("t", &path, 10, Duration::from_secs(1)).unwrap();
    assert!(table.is_installed());
    assert_eq!(table.list_names().unwrap(), vec!["b".to_string()]);
    assert_eq!(table.indexes().unwrap().len(), 2);
}

#[test]
fn drop_index_requires_existing_index() {
    let table = installed(Duration::from_secs(1));
    assert!(matches!(table.drop_index("nope"), Err(StoreError::IndexMissing(_))));
    table.drop_index("transformconnections_pkey").unwrap();
    assert!(table.indexes().unwrap().is_empty());
}
