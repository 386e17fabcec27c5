//! Record store engine for tuplestore
//!
//! This crate maps typed records onto the sorted key-value engine:
//! - Record / RecordDescriptor: how a Rust type becomes key and fields
//! - FieldWriter / FieldReader: versioned, tagged value buffer
//! - TransactionContext: insert, get, delete, select and count in one transaction
//! - Store: opens an engine from a data directory and `store.toml`
//!
//! Key encoding and query compilation live in `tuplestore-core`; the engine
//! seam and its backends live in `tuplestore-storage`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod document;
pub mod error;
pub mod fields;
pub mod record;
pub mod store;

pub use context::{ScanOptions, TransactionContext};
pub use document::DocumentMapping;
pub use error::{Error, Result};
pub use fields::{Field, FieldKind, FieldReader, FieldWriter, SerializedRecord};
pub use record::{InsertPolicy, KeyValues, Record, RecordDescriptor};
pub use store::{Store, StoreConfig, CONFIG_FILE_NAME, DATA_FILE_NAME};
