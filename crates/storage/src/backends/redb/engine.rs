//! Redb storage engine
//!
//! `RedbEngine` implements [`StorageEngine`] on top of a single redb
//! database file.

use std::path::Path;

use ::redb::backends::InMemoryBackend;
use ::redb::Database;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::transaction::RedbTransaction;
use crate::error::{StorageError, StorageResult};
use crate::traits::StorageEngine;

/// When a committed write transaction becomes durable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Fsync before `commit` returns
    #[default]
    Immediate,
    /// Persist with a later commit; a crash may lose recent commits
    Eventual,
}

impl Durability {
    fn to_redb(self) -> ::redb::Durability {
        match self {
            Durability::Immediate => ::redb::Durability::Immediate,
            Durability::Eventual => ::redb::Durability::Eventual,
        }
    }
}

/// Configuration options for the redb engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedbConfig {
    /// Page cache size in bytes, redb's default when unset
    pub cache_size: Option<usize>,

    /// Durability applied to every write transaction
    pub durability: Durability,
}

impl RedbConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache size
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Set the commit durability
    #[must_use]
    pub const fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }
}

/// A storage engine backed by redb
///
/// # Example
///
/// ```
/// use tuplestore_storage::{RedbEngine, StorageEngine, Transaction};
///
/// let engine = RedbEngine::in_memory().unwrap();
///
/// let mut txn = engine.begin_write().unwrap();
/// txn.put("people", b"k", b"v").unwrap();
/// txn.commit().unwrap();
/// ```
pub struct RedbEngine {
    db: Database,
    config: RedbConfig,
}

impl RedbEngine {
    /// Open or create a database file with default configuration
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Open or create a database file with custom configuration
    pub fn open_with_config(path: impl AsRef<Path>, config: RedbConfig) -> StorageResult<Self> {
        let path = path.as_ref();
        let mut builder = Database::builder();
        if let Some(cache_size) = config.cache_size {
            builder.set_cache_size(cache_size);
        }
        let db = builder
            .create(path)
            .map_err(|e| StorageError::Open(e.to_string()))?;

        info!(
            target: "tuplestore::storage",
            path = %path.display(),
            durability = ?config.durability,
            "Opened redb database"
        );
        Ok(Self { db, config })
    }

    /// Create a database that lives only in memory
    pub fn in_memory() -> StorageResult<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Self {
            db,
            config: RedbConfig::default(),
        })
    }

    /// Configuration the engine was opened with
    pub fn config(&self) -> &RedbConfig {
        &self.config
    }
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction;

    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::Read(txn))
    }

    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>> {
        let mut txn = self
            .db
            .begin_write()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        txn.set_durability(self.config.durability.to_redb());
        Ok(RedbTransaction::Write(txn))
    }
}
