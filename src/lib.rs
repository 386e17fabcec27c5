//! tuplestore - embedded typed record store
//!
//! Typed records are stored in a sorted key-value engine under a composite
//! key built from some of their fields, so ordered range queries need no
//! query planner.
//!
//! # Quick Start
//!
//! ```
//! use tuplestore::{DecodingError, FieldReader, FieldWriter, KeyQuery, KeySchema, KeyValues};
//! use tuplestore::{Record, RecordDescriptor, Store, Value, ValueKind};
//!
//! struct City {
//!     country: String,
//!     name: String,
//!     population: u64,
//! }
//!
//! impl Record for City {
//!     fn descriptor() -> RecordDescriptor {
//!         RecordDescriptor::new(
//!             "cities",
//!             KeySchema::new()
//!                 .with("country", ValueKind::Text)
//!                 .with("name", ValueKind::Text),
//!         )
//!     }
//!
//!     fn key_values(&self) -> Vec<Value> {
//!         vec![self.country.clone().into(), self.name.clone().into()]
//!     }
//!
//!     fn write_fields(&self, fields: &mut FieldWriter) {
//!         fields.put(&self.population);
//!     }
//!
//!     fn from_parts(mut key: KeyValues, fields: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
//!         Ok(City {
//!             country: key.take()?,
//!             name: key.take()?,
//!             population: fields.take()?,
//!         })
//!     }
//! }
//!
//! let store = Store::in_memory();
//! store.write(|txn| {
//!     txn.insert(&City { country: "FR".into(), name: "Lyon".into(), population: 522_000 })?;
//!     txn.insert(&City { country: "FR".into(), name: "Paris".into(), population: 2_100_000 })?;
//!     txn.insert(&City { country: "IT".into(), name: "Roma".into(), population: 2_800_000 })
//! })?;
//!
//! let query = KeyQuery::new().eq("country", "FR").ge("name", "M");
//! let cities: Vec<City> = store.read(|txn| txn.select(&query))?;
//! assert_eq!(cities.len(), 1);
//! assert_eq!(cities[0].name, "Paris");
//! # Ok::<(), tuplestore::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `tuplestore-core`: order-preserving codec, key schemas, query compiler
//! - `tuplestore-storage`: the engine seam, cursors, memory and redb engines
//! - `tuplestore-engine`: records, field buffers, transactions and the store

pub use tuplestore_core::{
    compile, CompiledRange, Constraint, DecodingError, EncodingError, KeyComponent, KeyQuery,
    KeySchema, Predicate, Primitive, QueryError, ScanDirection, Value, ValueKind,
};
pub use tuplestore_engine::{
    DocumentMapping, Error, Field, FieldReader, FieldWriter, InsertPolicy, KeyValues, Record,
    RecordDescriptor, Result, ScanOptions, SerializedRecord, Store, StoreConfig,
    TransactionContext, CONFIG_FILE_NAME,
};
pub use tuplestore_storage::{
    Durability, MemoryEngine, RedbEngine, StorageEngine, StorageError, Transaction,
};

/// Lower-level building blocks, one module per crate
pub mod layers {
    pub use tuplestore_core as core;
    pub use tuplestore_engine as engine;
    pub use tuplestore_storage as storage;
}
