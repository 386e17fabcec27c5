//! Persistent storage backends

pub mod redb;

pub use self::redb::{Durability, RedbConfig, RedbEngine, RedbTransaction};
