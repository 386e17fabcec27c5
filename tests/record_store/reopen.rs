//! Data written through one `Store` is visible after reopening the directory.

use chrono::TimeZone;
use tuplestore::{KeyQuery, ScanOptions, Store, Value};
use uuid::Uuid;

use crate::common::{at_millis, entry, LogEntry, TestDir};

#[test]
fn test_reopen_and_select_by_exact_key() {
    let dir = TestDir::new();
    let vessel = Uuid::new_v4();
    let written = entry(vessel, 1_700_000_000_123, "Cornelius");

    {
        let store = Store::open(dir.store_path()).unwrap();
        store.write(|txn| txn.insert(&written)).unwrap();
        store.flush().unwrap();
    }

    let store = Store::open(dir.store_path()).unwrap();
    let query = KeyQuery::new()
        .eq("vessel", vessel)
        .eq("logged_at", written.logged_at);
    let found: Vec<LogEntry> = store.read(|txn| txn.select(&query)).unwrap();
    assert_eq!(found, vec![written.clone()]);

    let key = [Value::Uuid(vessel), Value::Timestamp(written.logged_at)];
    let by_key: Option<LogEntry> = store.read(|txn| txn.get(&key)).unwrap();
    assert_eq!(by_key, Some(written));
}

#[test]
fn test_reopen_preserves_timestamp_order() {
    let dir = TestDir::new();
    let vessel = Uuid::new_v4();
    let other = Uuid::new_v4();

    {
        let store = Store::open(dir.store_path()).unwrap();
        store
            .write(|txn| {
                for millis in [-5_000, 1_000, -1, 0, 42, 7_000_000] {
                    txn.insert(&entry(vessel, millis, "log"))?;
                }
                txn.insert(&entry(other, 0, "elsewhere"))
            })
            .unwrap();
    }

    let store = Store::open(dir.store_path()).unwrap();
    let bounded_twice = KeyQuery::new()
        .eq("vessel", vessel)
        .ge("logged_at", at_millis(-1))
        .le("logged_at", at_millis(50));
    let err = store
        .read(|txn| txn.select::<LogEntry>(&bounded_twice))
        .unwrap_err();
    assert!(matches!(err, tuplestore::Error::Query(_)));

    let query = KeyQuery::new().eq("vessel", vessel).ge("logged_at", at_millis(-1));
    let found: Vec<LogEntry> = store.read(|txn| txn.select(&query)).unwrap();
    let stamps: Vec<i64> = found.iter().map(|e| e.logged_at.timestamp_millis()).collect();
    assert_eq!(stamps, vec![-1, 0, 42, 1_000, 7_000_000]);

    let newest: Vec<LogEntry> = store
        .read(|txn| {
            txn.select_with(
                &KeyQuery::new().eq("vessel", vessel),
                ScanOptions::new().reverse().with_limit(2),
            )
        })
        .unwrap();
    let stamps: Vec<i64> = newest.iter().map(|e| e.logged_at.timestamp_millis()).collect();
    assert_eq!(stamps, vec![7_000_000, 1_000]);
}

#[test]
fn test_sub_millisecond_key_is_truncated() {
    let dir = TestDir::new();
    let vessel = Uuid::new_v4();
    let precise = chrono::Utc
        .timestamp_opt(1_700_000_000, 123_456_789)
        .single()
        .unwrap();
    let mut written = entry(vessel, 0, "Vito");
    written.logged_at = precise;

    let store = Store::open(dir.store_path()).unwrap();
    store.write(|txn| txn.insert(&written)).unwrap();

    let found: Vec<LogEntry> = store
        .read(|txn| txn.select(&KeyQuery::new().eq("vessel", vessel)))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].logged_at.timestamp_subsec_nanos(), 123_000_000);
    assert_eq!(found[0].author, "Vito");
}
