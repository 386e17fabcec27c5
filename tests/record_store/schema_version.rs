//! Values written under one schema version are refused by another.

use tuplestore::{
    DecodingError, FieldReader, FieldWriter, KeyQuery, KeySchema, KeyValues, Record,
    RecordDescriptor, Store, Value, ValueKind,
};

use crate::common::TestDir;

/// Version 1 layout: a name and an age
#[derive(Debug, PartialEq)]
struct MemberV1 {
    id: u64,
    name: String,
    age: u64,
}

/// Version 2 layout: the age became a signed balance and a flag was added
#[derive(Debug, PartialEq)]
struct MemberV2 {
    id: u64,
    name: String,
    balance: i64,
    active: bool,
}

fn schema() -> KeySchema {
    KeySchema::new().with("id", ValueKind::Uint)
}

impl Record for MemberV1 {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new("members", schema())
    }

    fn key_values(&self) -> Vec<Value> {
        vec![self.id.into()]
    }

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields.put(&self.name).put(&self.age);
    }

    fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        Ok(MemberV1 {
            id: key.take()?,
            name: fields.take()?,
            age: fields.take()?,
        })
    }
}

impl Record for MemberV2 {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new("members", schema()).with_schema_version(2)
    }

    fn key_values(&self) -> Vec<Value> {
        vec![self.id.into()]
    }

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields.put(&self.name).put(&self.balance).put(&self.active);
    }

    fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        Ok(MemberV2 {
            id: key.take()?,
            name: fields.take()?,
            balance: fields.take()?,
            active: fields.take()?,
        })
    }
}

/// Claims version 1 but expects an extra trailing field
#[derive(Debug)]
#[allow(dead_code)]
struct MemberV1Extended {
    id: u64,
    name: String,
    age: u64,
    nickname: String,
}

impl Record for MemberV1Extended {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new("members", schema())
    }

    fn key_values(&self) -> Vec<Value> {
        vec![self.id.into()]
    }

    fn write_fields(&self, fields: &mut FieldWriter) {
        fields.put(&self.name).put(&self.age).put(&self.nickname);
    }

    fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
        Ok(MemberV1Extended {
            id: key.take()?,
            name: fields.take()?,
            age: fields.take()?,
            nickname: fields.take()?,
        })
    }
}

fn seeded_store(dir: &TestDir) -> Store {
    let store = Store::open(dir.store_path()).unwrap();
    store
        .write(|txn| {
            txn.insert(&MemberV1 {
                id: 1,
                name: "Ruby".into(),
                age: 30,
            })?;
            txn.insert(&MemberV1 {
                id: 2,
                name: "Leeloo".into(),
                age: 23,
            })
        })
        .unwrap();
    store
}

#[test]
fn test_newer_version_is_refused() {
    let dir = TestDir::new();
    let store = seeded_store(&dir);

    let err = store
        .read(|txn| txn.select::<MemberV2>(&KeyQuery::new()))
        .unwrap_err();
    assert!(err.is_schema_mismatch());
    assert!(err.to_string().contains("stored schema version 1, expected 2"));

    let err = store
        .read(|txn| txn.get::<MemberV2>(&[Value::Uint(1)]))
        .unwrap_err();
    assert!(err.is_schema_mismatch());
}

#[test]
fn test_same_version_with_extra_field_is_refused() {
    let dir = TestDir::new();
    let store = seeded_store(&dir);

    let err = store
        .read(|txn| txn.get::<MemberV1Extended>(&[Value::Uint(2)]))
        .unwrap_err();
    assert!(err.is_schema_mismatch());
}

#[test]
fn test_original_version_still_decodes() {
    let dir = TestDir::new();
    let store = seeded_store(&dir);
    drop(store);

    let store = Store::open(dir.store_path()).unwrap();
    let members: Vec<MemberV1> = store.read(|txn| txn.select(&KeyQuery::new())).unwrap();
    assert_eq!(
        members,
        vec![
            MemberV1 {
                id: 1,
                name: "Ruby".into(),
                age: 30
            },
            MemberV1 {
                id: 2,
                name: "Leeloo".into(),
                age: 23
            },
        ]
    );
}
