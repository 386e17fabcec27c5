//! Error type for the record store
//!
//! Every layer keeps its own error enum. `Error` wraps them so transaction
//! closures can use `?` on any of them.

use thiserror::Error;
use tuplestore_core::{DecodingError, EncodingError, QueryError};
use tuplestore_storage::StorageError;

/// Umbrella error for store and transaction operations
#[derive(Debug, Error)]
pub enum Error {
    /// A key could not be built from a record
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Stored bytes could not be decoded into a record
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// A query was rejected by the range compiler
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The storage engine failed or refused the operation
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// `store.toml` could not be read, parsed or written
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure while preparing the data directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// True if an insert hit an existing key under `RejectDuplicates`
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_duplicate_key())
    }

    /// True if the transaction was used after commit or abort
    pub fn is_transaction_closed(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_transaction_closed())
    }

    /// True if stored data did not match the expected record shape
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Error::Decoding(e) if e.is_schema_mismatch())
    }

    /// True if a query's constraints were arranged illegally
    pub fn is_invalid_arrangement(&self) -> bool {
        matches!(self, Error::Query(e) if e.is_invalid_arrangement())
    }
}
