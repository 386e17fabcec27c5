//! Storage engine seam
//!
//! This module defines the traits every backend implements:
//!
//! - [`StorageEngine`]: hands out read and write transactions
//! - [`Transaction`]: point reads and writes plus ordered batch scans, all
//!   scoped by table (sub-database) name
//!
//! Ordered iteration is provided once for every backend by
//! [`Cursor`](crate::Cursor), which pages through a table with
//! [`Transaction::scan`].

use std::ops::Bound;

use crate::cursor::Cursor;
use crate::error::{StorageError, StorageResult};

/// A key-value pair returned by scans and cursors
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result of a single cursor step
pub type CursorResult = StorageResult<Option<KeyValue>>;

/// A sorted, transactional key-value engine
///
/// Implementations must be thread-safe. Write transactions are serialized by
/// the engine: `begin_write` blocks while another write transaction is open.
///
/// # Example
///
/// ```
/// use tuplestore_storage::{MemoryEngine, StorageEngine, Transaction};
///
/// let engine = MemoryEngine::new();
///
/// let mut txn = engine.begin_write().unwrap();
/// txn.put("people", b"k", b"v").unwrap();
/// txn.commit().unwrap();
///
/// let txn = engine.begin_read().unwrap();
/// assert_eq!(txn.get("people", b"k").unwrap(), Some(b"v".to_vec()));
/// ```
pub trait StorageEngine: Send + Sync {
    /// Transaction type of this engine
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction over a consistent snapshot
    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>>;

    /// Begin a read-write transaction
    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>>;

    /// Flush buffered data to durable storage
    ///
    /// Backends that are durable on commit keep the default no-op.
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// One engine transaction
///
/// Write transactions must be committed explicitly; dropping one discards
/// its changes. A write transaction observes its own uncommitted writes.
pub trait Transaction {
    /// Get the value stored under `key` in `table`
    ///
    /// A table that was never written reads as empty.
    fn get(&self, table: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read-only transaction.
    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Store `value` under `key` only if the key is absent
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateKey`] if the key already exists.
    fn put_new(&mut self, table: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if self.get(table, key)?.is_some() {
            return Err(StorageError::DuplicateKey {
                table: table.to_string(),
            });
        }
        self.put(table, key, value)
    }

    /// Remove `key`, returning whether it existed
    fn delete(&mut self, table: &str, key: &[u8]) -> StorageResult<bool>;

    /// Read up to `limit` pairs inside `(lower, upper)`
    ///
    /// Pairs come back in ascending key order, or descending when `reverse`
    /// is set. An empty or inverted range yields no pairs.
    fn scan(
        &self,
        table: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
        reverse: bool,
    ) -> StorageResult<Vec<KeyValue>>;

    /// Commit all changes made by this transaction
    fn commit(self) -> StorageResult<()>;

    /// Discard all changes made by this transaction
    fn rollback(self) -> StorageResult<()>;

    /// Check if this is a read-only transaction
    fn is_read_only(&self) -> bool;

    /// Cursor over the whole table, positioned before the first key
    fn cursor(&self, table: &str) -> Cursor<'_, Self>
    where
        Self: Sized,
    {
        Cursor::new(self, table, Bound::Unbounded, Bound::Unbounded)
    }

    /// Cursor restricted to `(lower, upper)`
    fn range(&self, table: &str, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Cursor<'_, Self>
    where
        Self: Sized,
    {
        Cursor::new(self, table, lower, upper)
    }
}

/// True when no key can lie inside `(lower, upper)`
///
/// Backends check this before handing bounds to a range API that rejects
/// inverted ranges.
pub fn is_empty_range(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u))
        | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}
