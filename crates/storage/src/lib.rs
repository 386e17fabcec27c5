//! Storage layer for tuplestore
//!
//! This crate defines the sorted key-value engine seam and its backends:
//! - StorageEngine / Transaction: table-scoped transactional operations
//! - Cursor: batched ordered iteration shared by all backends
//! - MemoryEngine: copy-on-write BTreeMap engine for tests and ephemeral use
//! - RedbEngine: persistent engine on a single redb file
//!
//! Keys and values are opaque bytes here. Ordering is plain unsigned
//! lexicographic byte order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backends;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod traits;

pub use backends::{Durability, RedbConfig, RedbEngine, RedbTransaction};
pub use cursor::{Cursor, DEFAULT_BATCH_SIZE};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryEngine, MemoryTransaction};
pub use traits::{is_empty_range, CursorResult, KeyValue, StorageEngine, Transaction};
