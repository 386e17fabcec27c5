//! Error types for the pure layers
//!
//! This module defines the error taxonomy shared by the codec, the composite
//! key builder and the query compiler. All of them are pure-function failures
//! returned to the immediate caller; none are retried or swallowed.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::value::ValueKind;
use thiserror::Error;

/// Errors raised while turning values into key bytes.
///
/// `PrecisionLoss` is advisory: encoding still succeeds, the error only
/// describes what was dropped so callers can log it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Timestamp carried sub-millisecond precision that the key encoding drops
    #[error("Precision loss: timestamp drops {dropped_nanos}ns below millisecond resolution")]
    PrecisionLoss {
        /// Nanoseconds discarded by truncation
        dropped_nanos: u32,
    },

    /// Number of key components does not match the schema arity
    #[error("Arity mismatch: schema has {expected} component(s), got {actual}")]
    ArityMismatch {
        /// Arity declared by the schema
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// A key component has a different kind than the schema declares
    #[error("Kind mismatch for component '{component}': expected {expected}, got {actual}")]
    KindMismatch {
        /// Component name from the schema
        component: String,
        /// Kind declared by the schema
        expected: ValueKind,
        /// Kind of the supplied value
        actual: ValueKind,
    },

    /// A text or bytes field is longer than its u32 length prefix can hold
    #[error("Field too large: {len} bytes exceeds the u32 length prefix")]
    FieldTooLarge {
        /// Payload length in bytes
        len: usize,
    },
}

impl EncodingError {
    /// Check if this error is the non-fatal precision diagnostic
    pub fn is_precision_loss(&self) -> bool {
        matches!(self, EncodingError::PrecisionLoss { .. })
    }
}

/// Errors raised while reading encoded bytes back into values.
///
/// Every variant is fatal to the decode call. A decode failure during a scan
/// means the stored layout no longer matches the in-process shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    /// Fewer bytes remained than the value requires
    #[error("Truncated input: {kind} needs {needed} more byte(s), {remaining} remaining")]
    TruncatedInput {
        /// Kind being decoded
        kind: ValueKind,
        /// Bytes required
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },

    /// Bytes could not be mapped to a valid value
    #[error("Malformed {kind} value: {reason}")]
    MalformedValue {
        /// Kind being decoded
        kind: ValueKind,
        /// What was wrong
        reason: String,
    },

    /// Input did not match the expected schema shape
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl DecodingError {
    /// Build a `MalformedValue` error
    pub fn malformed(kind: ValueKind, reason: impl Into<String>) -> Self {
        DecodingError::MalformedValue {
            kind,
            reason: reason.into(),
        }
    }

    /// Build a `SchemaMismatch` error
    pub fn schema_mismatch(reason: impl Into<String>) -> Self {
        DecodingError::SchemaMismatch(reason.into())
    }

    /// Check if this is a schema mismatch
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, DecodingError::SchemaMismatch(_))
    }
}

/// Errors raised by the query constraint compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Constraints do not form an equality prefix plus at most one trailing range
    #[error("Invalid key arrangement: {0}")]
    InvalidKeyArrangement(String),

    /// Constraint names a component the schema does not have
    #[error("Unknown key component '{0}'")]
    UnknownComponent(String),

    /// Same component constrained more than once
    #[error("Duplicate constraint on key component '{0}'")]
    DuplicateConstraint(String),

    /// Bound value kind differs from the component kind
    #[error("Kind mismatch for component '{component}': expected {expected}, got {actual}")]
    KindMismatch {
        /// Component name
        component: String,
        /// Kind declared by the schema
        expected: ValueKind,
        /// Kind of the bound value
        actual: ValueKind,
    },
}

impl QueryError {
    /// Check if this is an invalid key arrangement
    pub fn is_invalid_arrangement(&self) -> bool {
        matches!(self, QueryError::InvalidKeyArrangement(_))
    }
}
