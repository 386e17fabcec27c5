//! Redb storage backend
//!
//! Each logical table maps to its own redb table of `&[u8] -> &[u8]`, so a
//! record type's keys live in a sub-database of their own.

mod engine;
mod transaction;

pub use engine::{Durability, RedbConfig, RedbEngine};
pub use transaction::RedbTransaction;
