//! Core types for tuplestore
//!
//! This crate holds the pure, storage-independent layers:
//! - Value / ValueKind: the closed set of primitive kinds
//! - codec: order-preserving binary encoding of single values
//! - KeySchema: composite key building and decoding
//! - KeyQuery / compile: constraint validation and range compilation
//! - Error types for each layer
//!
//! Nothing here touches I/O. The storage and engine crates build on it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod key;
pub mod query;
pub mod value;

pub use codec::{decode_exact, decode_value, encode_to_vec, encode_value, precision_loss};
pub use error::{DecodingError, EncodingError, QueryError};
pub use key::{prefix_successor, KeyComponent, KeySchema};
pub use query::{compile, CompiledRange, Constraint, KeyQuery, Predicate, ScanDirection};
pub use value::{Primitive, Value, ValueKind};
