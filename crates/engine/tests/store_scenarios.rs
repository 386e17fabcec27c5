//! Store Integration Tests
//!
//! Validates typed record operations end to end:
//! - Insert and select through composite keys
//! - Query validation surfacing through the store
//! - Closure API commit and rollback
//! - Concurrent readers alongside a writer
//!
//! Every scenario runs against both the in-memory and the redb engine.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use tuplestore_core::{DecodingError, KeyQuery, KeySchema, ScanDirection, Value, ValueKind};
use tuplestore_engine::{
    Error, FieldReader, FieldWriter, InsertPolicy, KeyValues, Record, RecordDescriptor,
    ScanOptions, Store, StoreConfig,
};
use tuplestore_storage::{MemoryEngine, RedbEngine, StorageEngine};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Person {
    last_name: String,
    first_name: String,
    id: Uuid,
    age: u64,
    email: Option<String>,
    joined: DateTime<Utc>,
}

impl Record for Person {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new(
            "people",
            KeySchema::new()
                .with("last_name", ValueKind::Text)
                .with("first_name", ValueKind::Text),
        )
    }

    fn key_values(&self) -> Vec<Value> {
        vec![self.last_name.clone().into(), self.first_name.clone().into()]
    }

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields
            .put(&self.id)
            .put(&self.age)
            .put(&self.email)
            .put(&self.joined);
    }

    fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        Ok(Person {
            last_name: key.take()?,
            first_name: key.take()?,
            id: fields.take()?,
            age: fields.take()?,
            email: fields.take()?,
            joined: fields.take()?,
        })
    }
}

/// Inserts of an existing key fail instead of overwriting
#[derive(Debug, Clone, PartialEq)]
struct Badge {
    holder: String,
    number: i64,
}

impl Record for Badge {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new(
            "badges",
            KeySchema::new()
                .with("holder", ValueKind::Text)
                .with("number", ValueKind::Int),
        )
        .with_insert_policy(InsertPolicy::RejectDuplicates)
    }

    fn key_values(&self) -> Vec<Value> {
        vec![self.holder.clone().into(), self.number.into()]
    }

    fn write_fields(&self, _fields: &mut FieldWriter) {}

    fn from_parts(mut key: KeyValues, _fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        Ok(Badge {
            holder: key.take()?,
            number: key.take()?,
        })
    }
}

fn person(last: &str, first: &str, age: u64) -> Person {
    Person {
        last_name: last.to_string(),
        first_name: first.to_string(),
        id: Uuid::new_v4(),
        age,
        email: None,
        joined: Utc.timestamp_opt(1_500_000_000, 0).single().unwrap(),
    }
}

fn names(people: &[Person]) -> Vec<(&str, &str)> {
    people
        .iter()
        .map(|p| (p.last_name.as_str(), p.first_name.as_str()))
        .collect()
}

fn seed<E: StorageEngine>(store: &Store<E>) {
    store
        .write(|txn| {
            txn.insert(&person("Dallas", "Korben", 45))?;
            txn.insert(&person("Dallas", "Leeloo", 23))?;
            txn.insert(&person("Zorg", "Jean-Baptiste", 52))?;
            Ok(())
        })
        .unwrap();
}

// ============================================================================
// Scenarios
// ============================================================================

fn check_equality_then_range<E: StorageEngine>(store: &Store<E>) {
    seed(store);
    let query = KeyQuery::new()
        .eq("last_name", "Dallas")
        .le("first_name", "Korben");
    let found: Vec<Person> = store.read(|txn| txn.select(&query)).unwrap();
    assert_eq!(names(&found), vec![("Dallas", "Korben")]);
    assert_eq!(found[0].age, 45);
}

fn check_range_on_first_component<E: StorageEngine>(store: &Store<E>) {
    seed(store);
    let query = KeyQuery::new().gt("last_name", "Dallas");
    let found: Vec<Person> = store.read(|txn| txn.select(&query)).unwrap();
    assert_eq!(names(&found), vec![("Zorg", "Jean-Baptiste")]);
}

fn check_invalid_arrangement<E: StorageEngine>(store: &Store<E>) {
    seed(store);
    let query = KeyQuery::new()
        .lt("last_name", "Zorg")
        .le("first_name", "Jean-Baptiste");
    let err = store
        .read(|txn| txn.select::<Person>(&query))
        .unwrap_err();
    assert!(err.is_invalid_arrangement(), "unexpected error: {}", err);
}

fn check_full_scan_order<E: StorageEngine>(store: &Store<E>) {
    seed(store);
    let all: Vec<Person> = store.read(|txn| txn.select(&KeyQuery::new())).unwrap();
    assert_eq!(
        names(&all),
        vec![
            ("Dallas", "Korben"),
            ("Dallas", "Leeloo"),
            ("Zorg", "Jean-Baptiste")
        ]
    );

    let reversed: Vec<Person> = store
        .read(|txn| {
            txn.select_with(
                &KeyQuery::new(),
                ScanOptions::new().with_direction(ScanDirection::Reverse),
            )
        })
        .unwrap();
    let mut expected = names(&all);
    expected.reverse();
    assert_eq!(names(&reversed), expected);
}

fn check_prefix_does_not_bleed<E: StorageEngine>(store: &Store<E>) {
    seed(store);
    store
        .write(|txn| txn.insert(&person("Dallas2", "Ruby", 30)))
        .unwrap();
    let query = KeyQuery::new().eq("last_name", "Dallas");
    let n = store.read(|txn| txn.count::<Person>(&query)).unwrap();
    assert_eq!(n, 2);
}

fn check_overwrite_policy<E: StorageEngine>(store: &Store<E>) {
    seed(store);
    let mut older = person("Dallas", "Korben", 46);
    older.email = Some("korben@fhloston.example".into());
    store.write(|txn| txn.insert(&older)).unwrap();

    let key = [Value::from("Dallas"), Value::from("Korben")];
    let stored: Person = store.read(|txn| txn.get(&key)).unwrap().unwrap();
    assert_eq!(stored, older);
}

fn check_reject_duplicates<E: StorageEngine>(store: &Store<E>) {
    let badge = Badge {
        holder: "Leeloo".into(),
        number: -5,
    };
    store.write(|txn| txn.insert(&badge)).unwrap();
    let err = store.write(|txn| txn.insert(&badge)).unwrap_err();
    assert!(err.is_duplicate_key());
}

fn check_failed_body_rolls_back<E: StorageEngine>(store: &Store<E>) {
    let result: Result<(), Error> = store.write(|txn| {
        txn.insert(&person("Cornelius", "Vito", 60))?;
        Err(Error::config("body failed"))
    });
    assert!(result.is_err());

    let n = store
        .read(|txn| txn.count::<Person>(&KeyQuery::new()))
        .unwrap();
    assert_eq!(n, 0);
}

fn check_explicit_lifecycle<E: StorageEngine>(store: &Store<E>) {
    let mut txn = store.begin_write().unwrap();
    txn.insert(&person("Rhod", "Ruby", 30)).unwrap();
    txn.commit().unwrap();
    assert!(txn.insert(&person("Rhod", "Ruby", 31)).unwrap_err().is_transaction_closed());

    let txn = store.begin_read().unwrap();
    assert!(txn.is_read_only());
    let key = [Value::from("Rhod"), Value::from("Ruby")];
    assert_eq!(txn.get::<Person>(&key).unwrap().unwrap().age, 30);
}

macro_rules! scenarios {
    ($module:ident, $make:expr) => {
        mod $module {
            use super::*;

            #[test]
            fn test_equality_then_range() {
                check_equality_then_range(&$make);
            }

            #[test]
            fn test_range_on_first_component() {
                check_range_on_first_component(&$make);
            }

            #[test]
            fn test_invalid_arrangement() {
                check_invalid_arrangement(&$make);
            }

            #[test]
            fn test_full_scan_order() {
                check_full_scan_order(&$make);
            }

            #[test]
            fn test_prefix_does_not_bleed() {
                check_prefix_does_not_bleed(&$make);
            }

            #[test]
            fn test_overwrite_policy() {
                check_overwrite_policy(&$make);
            }

            #[test]
            fn test_reject_duplicates() {
                check_reject_duplicates(&$make);
            }

            #[test]
            fn test_failed_body_rolls_back() {
                check_failed_body_rolls_back(&$make);
            }

            #[test]
            fn test_explicit_lifecycle() {
                check_explicit_lifecycle(&$make);
            }
        }
    };
}

fn small_batches() -> StoreConfig {
    StoreConfig::default().with_scan_batch_size(1)
}

scenarios!(memory_store, Store::with_engine(MemoryEngine::new(), small_batches()));
scenarios!(
    redb_store,
    Store::with_engine(RedbEngine::in_memory().unwrap(), small_batches())
);

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_readers_see_committed_snapshots() {
    let store = Arc::new(Store::in_memory());
    seed(&*store);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..50u64 {
                store
                    .write(|txn| txn.insert(&person("Zorg", &format!("clone-{:02}", i), i)))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    let dallas = store
                        .read(|txn| txn.count::<Person>(&KeyQuery::new().eq("last_name", "Dallas")))
                        .unwrap();
                    assert_eq!(dallas, 2);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let zorgs = store
        .read(|txn| txn.count::<Person>(&KeyQuery::new().eq("last_name", "Zorg")))
        .unwrap();
    assert_eq!(zorgs, 51);
}
