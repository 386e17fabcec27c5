//! In-memory storage engine
//!
//! `MemoryEngine` keeps every table in a `BTreeMap` behind an `Arc`.
//!
//! # Design Notes
//!
//! - **Snapshots**: a read transaction clones the `Arc` of the committed
//!   state, so it never sees later commits.
//! - **Copy on write**: a write transaction starts from the same `Arc` and
//!   deep-clones it on its first mutation (`Arc::make_mut`).
//! - **Single writer**: `begin_write` holds a `parking_lot::Mutex` guard for
//!   the transaction's lifetime. Commit swaps the working state in.
//!
//! Nothing is persisted. Intended for tests and ephemeral stores.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::trace;

use crate::error::{StorageError, StorageResult};
use crate::traits::{is_empty_range, KeyValue, StorageEngine, Transaction};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;
type Tables = BTreeMap<String, Table>;

/// Storage engine backed by in-process ordered maps
#[derive(Debug, Default)]
pub struct MemoryEngine {
    committed: RwLock<Arc<Tables>>,
    writer: Mutex<()>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys committed to `table`
    pub fn table_len(&self, table: &str) -> usize {
        self.committed.read().get(table).map_or(0, BTreeMap::len)
    }
}

impl StorageEngine for MemoryEngine {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>> {
        let snapshot = self.committed.read().clone();
        Ok(MemoryTransaction::Read { snapshot })
    }

    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>> {
        let guard = self.writer.lock();
        let working = self.committed.read().clone();
        trace!(target: "tuplestore::storage", "memory write transaction started");
        Ok(MemoryTransaction::Write {
            engine: self,
            working,
            _guard: guard,
        })
    }
}

/// Transaction over a [`MemoryEngine`]
pub enum MemoryTransaction<'a> {
    /// Read-only view of one committed state
    Read {
        /// Committed tables at begin time
        snapshot: Arc<Tables>,
    },
    /// Exclusive read-write transaction
    Write {
        /// Engine the changes are committed to
        engine: &'a MemoryEngine,
        /// Working copy, private until commit
        working: Arc<Tables>,
        /// Writer lock held until commit or rollback
        _guard: MutexGuard<'a, ()>,
    },
}

impl MemoryTransaction<'_> {
    fn tables(&self) -> &Tables {
        match self {
            MemoryTransaction::Read { snapshot } => snapshot,
            MemoryTransaction::Write { working, .. } => working,
        }
    }

    fn tables_mut(&mut self) -> StorageResult<&mut Tables> {
        match self {
            MemoryTransaction::Read { .. } => Err(StorageError::ReadOnly),
            MemoryTransaction::Write { working, .. } => Ok(Arc::make_mut(working)),
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&self, table: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .tables()
            .get(table)
            .and_then(|t| t.get(key))
            .cloned())
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tables_mut()?
            .entry(table.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, table: &str, key: &[u8]) -> StorageResult<bool> {
        if self.is_read_only() {
            return Err(StorageError::ReadOnly);
        }
        if self.get(table, key)?.is_none() {
            return Ok(false);
        }
        let removed = self
            .tables_mut()?
            .get_mut(table)
            .and_then(|t| t.remove(key))
            .is_some();
        Ok(removed)
    }

    fn scan(
        &self,
        table: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
        reverse: bool,
    ) -> StorageResult<Vec<KeyValue>> {
        let Some(t) = self.tables().get(table) else {
            return Ok(Vec::new());
        };
        if is_empty_range(lower, upper) {
            return Ok(Vec::new());
        }
        let range = t.range::<[u8], _>((lower, upper));
        let pairs = |(k, v): (&Vec<u8>, &Vec<u8>)| (k.clone(), v.clone());
        let out = if reverse {
            range.rev().take(limit).map(pairs).collect()
        } else {
            range.take(limit).map(pairs).collect()
        };
        Ok(out)
    }

    fn commit(self) -> StorageResult<()> {
        if let MemoryTransaction::Write {
            engine, working, ..
        } = self
        {
            *engine.committed.write() = working;
            trace!(target: "tuplestore::storage", "memory write transaction committed");
        }
        Ok(())
    }

    fn rollback(self) -> StorageResult<()> {
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        matches!(self, MemoryTransaction::Read { .. })
    }
}
