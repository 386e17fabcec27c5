//! Transaction context
//!
//! `TransactionContext` wraps exactly one engine transaction and maps typed
//! record operations onto raw sorted-key operations:
//! - insert: build key and value, then put (or put-if-absent)
//! - get / delete: exact key lookups
//! - select / count: compile a query into a byte range and walk it with a
//!   cursor, decoding every pair
//!
//! Once `commit` or `abort` has run, every further call fails with
//! `StorageError::TransactionClosed`.

use std::ops::Bound;

use tracing::{debug, warn};
use tuplestore_core::{compile, precision_loss, CompiledRange, KeyQuery, ScanDirection, Value};
use tuplestore_storage::{Cursor, CursorResult, StorageEngine, StorageError, Transaction};

use crate::error::Result;
use crate::fields::SerializedRecord;
use crate::record::{InsertPolicy, Record};

/// Limit and direction for [`TransactionContext::select_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanOptions {
    /// Stop after this many records
    pub limit: Option<usize>,
    /// Walk order over the compiled range
    pub direction: ScanDirection,
}

impl ScanOptions {
    /// Forward scan without a limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `limit` records
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Walk the range in `direction`
    #[must_use]
    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Walk the range in descending key order
    #[must_use]
    pub fn reverse(self) -> Self {
        self.with_direction(ScanDirection::Reverse)
    }
}

/// One open transaction against a store
///
/// Obtained from [`Store::begin_read`](crate::Store::begin_read),
/// [`Store::begin_write`](crate::Store::begin_write) or the closure helpers.
/// Dropping an active write context discards its changes.
pub struct TransactionContext<'s, E: StorageEngine + 's> {
    txn: Option<E::Transaction<'s>>,
    id: u64,
    read_only: bool,
    batch_size: usize,
}

impl<'s, E: StorageEngine + 's> TransactionContext<'s, E> {
    pub(crate) fn new(txn: E::Transaction<'s>, id: u64, batch_size: usize) -> Self {
        let read_only = txn.is_read_only();
        debug!(target: "tuplestore::context", txn_id = id, read_only, "transaction begin");
        Self {
            txn: Some(txn),
            id,
            read_only,
            batch_size,
        }
    }

    /// Identifier assigned by the store, unique per store instance
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True for contexts opened with `begin_read`
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True until `commit` or `abort` runs
    pub fn is_active(&self) -> bool {
        self.txn.is_some()
    }

    fn txn(&self) -> Result<&E::Transaction<'s>> {
        self.txn
            .as_ref()
            .ok_or_else(|| StorageError::TransactionClosed.into())
    }

    fn txn_mut(&mut self) -> Result<&mut E::Transaction<'s>> {
        self.txn
            .as_mut()
            .ok_or_else(|| StorageError::TransactionClosed.into())
    }

    /// Store `record` under its composite key
    ///
    /// With [`InsertPolicy::RejectDuplicates`] an existing key fails with
    /// `StorageError::DuplicateKey` and nothing is written. Timestamps in the
    /// key are truncated to milliseconds; a warning is logged when that
    /// drops precision.
    pub fn insert<R: Record>(&mut self, record: &R) -> Result<()> {
        let descriptor = R::descriptor();
        let serialized = SerializedRecord::encode(record, &descriptor)?;
        let txn = self.txn_mut()?;
        match descriptor.insert_policy() {
            InsertPolicy::Overwrite => {
                txn.put(descriptor.name(), &serialized.key, &serialized.value)?
            }
            InsertPolicy::RejectDuplicates => {
                txn.put_new(descriptor.name(), &serialized.key, &serialized.value)?
            }
        }

        for value in record.key_values() {
            if let Some(loss) = precision_loss(&value) {
                warn!(
                    target: "tuplestore::context",
                    txn_id = self.id,
                    table = descriptor.name(),
                    "{}",
                    loss
                );
            }
        }
        Ok(())
    }

    /// Fetch the record stored under the exact key `key`
    pub fn get<R: Record>(&self, key: &[Value]) -> Result<Option<R>> {
        let descriptor = R::descriptor();
        let key = descriptor.key_schema().build_key(key)?;
        let Some(value) = self.txn()?.get(descriptor.name(), &key)? else {
            return Ok(None);
        };
        Ok(Some(SerializedRecord::decode(&descriptor, &key, &value)?))
    }

    /// Remove the record stored under `key`, returning whether it existed
    pub fn delete<R: Record>(&mut self, key: &[Value]) -> Result<bool> {
        let descriptor = R::descriptor();
        let key = descriptor.key_schema().build_key(key)?;
        Ok(self.txn_mut()?.delete(descriptor.name(), &key)?)
    }

    /// All records matching `query`, in ascending key order
    ///
    /// A decode failure aborts the whole select; no partial result is
    /// returned.
    pub fn select<R: Record>(&self, query: &KeyQuery) -> Result<Vec<R>> {
        self.select_with(query, ScanOptions::default())
    }

    /// Records matching `query` with an optional limit and direction
    pub fn select_with<R: Record>(&self, query: &KeyQuery, options: ScanOptions) -> Result<Vec<R>> {
        let descriptor = R::descriptor();
        let range = compile(descriptor.key_schema(), query)?.with_direction(options.direction);

        let mut records = Vec::new();
        self.walk(descriptor.name(), &range, options.limit, |key, value| {
            records.push(SerializedRecord::decode::<R>(&descriptor, key, value)?);
            Ok(())
        })?;

        debug!(
            target: "tuplestore::context",
            txn_id = self.id,
            table = descriptor.name(),
            direction = ?range.direction,
            returned = records.len(),
            "select"
        );
        Ok(records)
    }

    /// Number of records matching `query`
    ///
    /// Values are not decoded.
    pub fn count<R: Record>(&self, query: &KeyQuery) -> Result<usize> {
        let descriptor = R::descriptor();
        let range = compile(descriptor.key_schema(), query)?;
        let mut n = 0;
        self.walk(descriptor.name(), &range, None, |_, _| {
            n += 1;
            Ok(())
        })?;
        Ok(n)
    }

    fn walk<F>(&self, table: &str, range: &CompiledRange, limit: Option<usize>, mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        let txn = self.txn()?;
        if range.is_empty() || limit == Some(0) {
            return Ok(());
        }

        let batch_size = limit.map_or(self.batch_size, |l| l.min(self.batch_size));
        let mut cursor = txn
            .range(table, borrowed(&range.lower), borrowed(&range.upper))
            .with_batch_size(batch_size);
        let reverse = range.direction == ScanDirection::Reverse;

        let mut visited = 0;
        let mut entry = first(&mut cursor, reverse)?;
        while let Some((key, value)) = entry {
            visit(&key, &value)?;
            visited += 1;
            if limit.is_some_and(|l| visited >= l) {
                break;
            }
            entry = step(&mut cursor, reverse)?;
        }
        cursor.close();
        Ok(())
    }

    /// Commit all writes and close the context
    pub fn commit(&mut self) -> Result<()> {
        let txn = self.txn.take().ok_or(StorageError::TransactionClosed)?;
        txn.commit()?;
        debug!(target: "tuplestore::context", txn_id = self.id, "transaction commit");
        Ok(())
    }

    /// Discard all writes and close the context
    pub fn abort(&mut self) -> Result<()> {
        let txn = self.txn.take().ok_or(StorageError::TransactionClosed)?;
        txn.rollback()?;
        debug!(target: "tuplestore::context", txn_id = self.id, "transaction abort");
        Ok(())
    }
}

impl<'s, E: StorageEngine + 's> std::fmt::Debug for TransactionContext<'s, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("id", &self.id)
            .field("read_only", &self.read_only)
            .field("active", &self.is_active())
            .finish()
    }
}

fn first<T: Transaction>(cursor: &mut Cursor<'_, T>, reverse: bool) -> CursorResult {
    if reverse {
        cursor.seek_last()
    } else {
        cursor.seek_first()
    }
}

fn step<T: Transaction>(cursor: &mut Cursor<'_, T>, reverse: bool) -> CursorResult {
    if reverse {
        cursor.prev()
    } else {
        cursor.next()
    }
}

fn borrowed(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}
