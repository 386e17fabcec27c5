//! Store configuration via `store.toml`
//!
//! On first open a default `store.toml` is written into the data directory.
//! To change settings, edit the file and reopen the store, or pass a
//! `StoreConfig` to `Store::open_with_config`, which persists it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tuplestore_storage::{Durability, RedbConfig, DEFAULT_BATCH_SIZE};

use crate::error::{Error, Result};

/// Config file name placed in the store data directory.
pub const CONFIG_FILE_NAME: &str = "store.toml";

/// Store configuration loaded from `store.toml`.
///
/// # Example
///
/// ```toml
/// # "immediate" (default) or "eventual"
/// durability = "immediate"
///
/// # cache_size = 67108864
/// scan_batch_size = 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Commit durability: `"immediate"` or `"eventual"`.
    #[serde(default)]
    pub durability: Durability,
    /// Page cache size in bytes; the engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<usize>,
    /// Number of pairs a select cursor fetches per batch.
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
}

fn default_scan_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            durability: Durability::default(),
            cache_size: None,
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

impl StoreConfig {
    /// Set the commit durability
    #[must_use]
    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Set the page cache size in bytes
    #[must_use]
    pub fn with_cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = Some(bytes);
        self
    }

    /// Set the cursor batch size used by selects
    #[must_use]
    pub fn with_scan_batch_size(mut self, batch: usize) -> Self {
        self.scan_batch_size = batch;
        self
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns an error if `scan_batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.scan_batch_size == 0 {
            return Err(Error::config(format!(
                "Invalid scan_batch_size 0 in {}. Expected a positive integer.",
                CONFIG_FILE_NAME
            )));
        }
        Ok(())
    }

    /// Engine options derived from this config.
    pub fn redb_config(&self) -> RedbConfig {
        let config = RedbConfig::new().durability(self.durability);
        match self.cache_size {
            Some(bytes) => config.cache_size(bytes),
            None => config,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# tuplestore configuration
#
# Commit durability: "immediate" (default) or "eventual"
#   "immediate" = fsync before commit returns
#   "eventual"  = fsync deferred, a crash may lose the latest commits
durability = "immediate"

# Page cache size in bytes (default: engine default)
# cache_size = 67108864

# Key/value pairs fetched per cursor batch during selects (default: 256)
scan_batch_size = 256
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
