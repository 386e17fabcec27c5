//! Store: the entry point of tuplestore
//!
//! A `Store` owns one storage engine and hands out transaction contexts.
//!
//! ## Opening
//!
//! `Store::open(dir)` creates the directory if needed, writes a default
//! `store.toml` on first open, loads it and opens `data.redb` beside it.
//! `Store::in_memory()` needs no directory and keeps everything in a
//! `MemoryEngine`.
//!
//! ## Transactions
//!
//! The closure helpers are the usual way in:
//!
//! ```
//! use tuplestore_core::KeyQuery;
//! use tuplestore_engine::Store;
//! # use tuplestore_core::{DecodingError, KeySchema, Value, ValueKind};
//! # use tuplestore_engine::{FieldReader, FieldWriter, KeyValues, Record, RecordDescriptor};
//! # struct Tag { name: String }
//! # impl Record for Tag {
//! #     fn descriptor() -> RecordDescriptor {
//! #         RecordDescriptor::new("tags", KeySchema::new().with("name", ValueKind::Text))
//! #     }
//! #     fn key_values(&self) -> Vec<Value> { vec![self.name.clone().into()] }
//! #     fn write_fields(&self, _: &mut FieldWriter) {}
//! #     fn from_parts(mut key: KeyValues, _: &mut FieldReader<'_>) -> Result<Self, DecodingError> {
//! #         Ok(Tag { name: key.take()? })
//! #     }
//! # }
//!
//! let store = Store::in_memory();
//! store.write(|txn| txn.insert(&Tag { name: "rust".into() }))?;
//!
//! let tags: Vec<Tag> = store.read(|txn| txn.select(&KeyQuery::new()))?;
//! assert_eq!(tags.len(), 1);
//! # Ok::<(), tuplestore_engine::Error>(())
//! ```
//!
//! `write` commits when the closure returns `Ok` and aborts when it returns
//! `Err`. The closure may also conclude the context itself.

pub mod config;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};
use tuplestore_storage::{MemoryEngine, RedbEngine, StorageEngine};

use crate::context::TransactionContext;
use crate::error::Result;
pub use config::{StoreConfig, CONFIG_FILE_NAME};

/// Engine data file name inside the store directory.
pub const DATA_FILE_NAME: &str = "data.redb";

/// An embedded typed record store
pub struct Store<E: StorageEngine = RedbEngine> {
    engine: E,
    config: StoreConfig,
    path: Option<PathBuf>,
    next_txn_id: AtomicU64,
}

impl Store<RedbEngine> {
    /// Open the store in `dir`, creating it with a default `store.toml`
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created, the config cannot be read
    /// or is invalid, or the engine cannot open its data file.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let data_dir = dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let config_path = data_dir.join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&config_path)?;
        let config = StoreConfig::from_file(&config_path)?;

        Self::open_with_config(data_dir, config)
    }

    /// Open the store in `dir` with an explicit configuration
    ///
    /// The supplied config is written to `store.toml` so that a later
    /// `Store::open` picks up the same settings.
    pub fn open_with_config<P: AsRef<Path>>(dir: P, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let data_dir = dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        config.write_to_file(&data_dir.join(CONFIG_FILE_NAME))?;

        let engine = RedbEngine::open_with_config(data_dir.join(DATA_FILE_NAME), config.redb_config())?;
        info!(
            target: "tuplestore::store",
            path = %data_dir.display(),
            durability = ?config.durability,
            "store opened"
        );

        Ok(Self {
            engine,
            config,
            path: Some(data_dir.to_path_buf()),
            next_txn_id: AtomicU64::new(1),
        })
    }
}

impl Store<MemoryEngine> {
    /// A store that lives only as long as this value
    pub fn in_memory() -> Self {
        Self::with_engine(MemoryEngine::new(), StoreConfig::default())
    }
}

impl<E: StorageEngine> Store<E> {
    /// Wrap an already-open engine
    pub fn with_engine(engine: E, config: StoreConfig) -> Self {
        Self {
            engine,
            config,
            path: None,
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// The underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Data directory, `None` for stores not opened from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn next_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Begin a read-only transaction over a consistent snapshot
    pub fn begin_read(&self) -> Result<TransactionContext<'_, E>> {
        let txn = self.engine.begin_read()?;
        Ok(TransactionContext::new(txn, self.next_id(), self.config.scan_batch_size))
    }

    /// Begin a read-write transaction
    ///
    /// Blocks while another write transaction is open.
    pub fn begin_write(&self) -> Result<TransactionContext<'_, E>> {
        let txn = self.engine.begin_write()?;
        Ok(TransactionContext::new(txn, self.next_id(), self.config.scan_batch_size))
    }

    /// Run `f` inside a read-only transaction
    pub fn read<'s, F, T>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&TransactionContext<'s, E>) -> Result<T>,
    {
        let mut ctx = self.begin_read()?;
        let result = f(&ctx);
        if ctx.is_active() {
            ctx.abort()?;
        }
        result
    }

    /// Run `f` inside a write transaction
    ///
    /// Commits when `f` returns `Ok`, aborts when it returns `Err`. The
    /// closure's error is returned even if the abort itself fails.
    pub fn write<'s, F, T>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TransactionContext<'s, E>) -> Result<T>,
    {
        let mut ctx = self.begin_write()?;
        match f(&mut ctx) {
            Ok(value) => {
                if ctx.is_active() {
                    ctx.commit()?;
                }
                Ok(value)
            }
            Err(e) => {
                if ctx.is_active() {
                    if let Err(abort_err) = ctx.abort() {
                        warn!(
                            target: "tuplestore::store",
                            txn_id = ctx.id(),
                            error = %abort_err,
                            "abort after failed transaction body also failed"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Flush buffered engine data to durable storage
    pub fn flush(&self) -> Result<()> {
        Ok(self.engine.flush()?)
    }
}

impl<E: StorageEngine> std::fmt::Debug for Store<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tuplestore_storage::Durability;

    #[test]
    fn test_open_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
        assert!(dir.path().join(DATA_FILE_NAME).exists());
        assert_eq!(store.config(), &StoreConfig::default());
        assert_eq!(store.path(), Some(dir.path()));
    }

    #[test]
    fn test_open_with_config_persists_config() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::default()
            .with_durability(Durability::Eventual)
            .with_scan_batch_size(8);
        drop(Store::open_with_config(dir.path(), config.clone()).unwrap());

        let reopened = Store::open(dir.path()).unwrap();
        assert_eq!(reopened.config(), &config);
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "scan_batch_size = 0\n").unwrap();
        assert!(matches!(
            Store::open(dir.path()).unwrap_err(),
            crate::Error::Config(_)
        ));
    }

    #[test]
    fn test_transaction_ids_increase() {
        let store = Store::in_memory();
        let a = store.begin_read().unwrap().id();
        let b = store.begin_write().unwrap().id();
        assert!(b > a);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_write_closure_may_conclude_itself() {
        let store = Store::in_memory();
        let out = store
            .write(|txn| {
                txn.abort()?;
                Ok(7)
            })
            .unwrap();
        assert_eq!(out, 7);
    }

    #[test]
    fn test_flush_is_ok() {
        Store::in_memory().flush().unwrap();
    }
}
