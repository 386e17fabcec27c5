//! Redb transaction
//!
//! `RedbTransaction` wraps either a read-only or a read-write redb
//! transaction behind the [`Transaction`] trait. Tables are opened per call;
//! a table that was never written reads as empty.

use std::ops::Bound;

use ::redb::{
    AccessGuard, ReadTransaction, ReadableTable, TableDefinition, TableError, WriteTransaction,
};

use crate::error::{StorageError, StorageResult};
use crate::traits::{is_empty_range, KeyValue, Transaction};

type BytesTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

fn table_def(name: &str) -> BytesTable<'_> {
    TableDefinition::new(name)
}

/// A transaction for the redb engine
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction
    Read(ReadTransaction),
    /// A read-write transaction
    Write(WriteTransaction),
}

impl Transaction for RedbTransaction {
    fn get(&self, table: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        match self {
            Self::Read(txn) => match txn.open_table(table_def(table)) {
                Ok(t) => get_from(&t, key),
                Err(TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(StorageError::internal(e)),
            },
            Self::Write(txn) => {
                let t = txn.open_table(table_def(table)).map_err(StorageError::internal)?;
                get_from(&t, key)
            }
        }
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(txn) => {
                let mut t = txn.open_table(table_def(table)).map_err(StorageError::internal)?;
                t.insert(key, value).map_err(StorageError::internal)?;
                Ok(())
            }
        }
    }

    fn delete(&mut self, table: &str, key: &[u8]) -> StorageResult<bool> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(txn) => {
                let mut t = txn.open_table(table_def(table)).map_err(StorageError::internal)?;
                let removed = t.remove(key).map_err(StorageError::internal)?;
                Ok(removed.is_some())
            }
        }
    }

    fn scan(
        &self,
        table: &str,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        limit: usize,
        reverse: bool,
    ) -> StorageResult<Vec<KeyValue>> {
        if is_empty_range(lower, upper) {
            return Ok(Vec::new());
        }
        match self {
            Self::Read(txn) => match txn.open_table(table_def(table)) {
                Ok(t) => scan_from(&t, lower, upper, limit, reverse),
                Err(TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(StorageError::internal(e)),
            },
            Self::Write(txn) => {
                let t = txn.open_table(table_def(table)).map_err(StorageError::internal)?;
                scan_from(&t, lower, upper, limit, reverse)
            }
        }
    }

    fn commit(self) -> StorageResult<()> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(txn) => txn
                .commit()
                .map_err(|e| StorageError::Commit(e.to_string())),
        }
    }

    fn rollback(self) -> StorageResult<()> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(txn) => txn
                .abort()
                .map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

fn get_from<T>(table: &T, key: &[u8]) -> StorageResult<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let value = table.get(key).map_err(StorageError::internal)?;
    Ok(value.map(|guard| guard.value().to_vec()))
}

fn scan_from<T>(
    table: &T,
    lower: Bound<&[u8]>,
    upper: Bound<&[u8]>,
    limit: usize,
    reverse: bool,
) -> StorageResult<Vec<KeyValue>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let range = table
        .range::<&[u8]>((lower, upper))
        .map_err(StorageError::internal)?;

    let mut out = Vec::with_capacity(limit.min(1024));
    if reverse {
        collect_into(range.rev().take(limit), &mut out)?;
    } else {
        collect_into(range.take(limit), &mut out)?;
    }
    Ok(out)
}

fn collect_into<'a, I>(entries: I, out: &mut Vec<KeyValue>) -> StorageResult<()>
where
    I: Iterator<
        Item = Result<
            (AccessGuard<'a, &'static [u8]>, AccessGuard<'a, &'static [u8]>),
            ::redb::StorageError,
        >,
    >,
{
    for entry in entries {
        let (k, v) = entry.map_err(StorageError::internal)?;
        out.push((k.value().to_vec(), v.value().to_vec()));
    }
    Ok(())
}
