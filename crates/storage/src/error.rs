//! Storage error types
//!
//! Backend failures are carried as strings so callers never depend on a
//! particular engine's error types.

use thiserror::Error;

/// Errors raised by storage engines, transactions and cursors
#[derive(Debug, Error)]
pub enum StorageError {
    /// A key already exists and the write asked not to overwrite it
    #[error("Duplicate key in table '{table}'")]
    DuplicateKey {
        /// Table (sub-database) the key was written to
        table: String,
    },

    /// The transaction was already committed or aborted
    #[error("Transaction already concluded")]
    TransactionClosed,

    /// Write attempted through a read-only transaction
    #[error("Write attempted in a read-only transaction")]
    ReadOnly,

    /// The database could not be opened or created
    #[error("Failed to open storage: {0}")]
    Open(String),

    /// A transaction could not be started or aborted
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The commit did not complete
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Filesystem failure outside the engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other engine failure
    #[error("Storage engine error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Check if this is a duplicate key rejection
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StorageError::DuplicateKey { .. })
    }

    /// Check if the transaction was already concluded
    pub fn is_transaction_closed(&self) -> bool {
        matches!(self, StorageError::TransactionClosed)
    }

    /// Wrap any displayable engine error as `Internal`
    pub fn internal(err: impl std::fmt::Display) -> Self {
        StorageError::Internal(err.to_string())
    }
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
