//! Record store integration tests
//!
//! Exercise the public `tuplestore` facade against on-disk stores.

mod common;

mod config_file;
mod reopen;
mod schema_version;
