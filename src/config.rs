//! Store configuration

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Directory extension of a persistent store
pub const STORE_EXTENSION: &str = "treedb";

/// Environment variable holding the log level for the binaries
pub const LOG_ENV: &str = "TREEDB_LOG";

/// Settings of a persistent (`SledStore`) store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory, normalized to the `.treedb` extension
    pub path: PathBuf,

    /// sled page cache size in bytes
    pub cache_capacity: u64,

    /// Flush to disk after every write/remove
    pub flush_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tree.treedb"),
            cache_capacity: 64 * 1024 * 1024,
            flush_on_write: false,
        }
    }
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: normalize_store_path(path),
            ..Self::default()
        }
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path.as_ref())?;
        let mut config: StoreConfig = serde_json::from_reader(file)?;
        config.path = normalize_store_path(&config.path);
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    pub fn flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }
}

/// Normalize a store path so it ends in `.treedb`
///
/// Examples:
/// - `/path/to/db` -> `/path/to/db.treedb`
/// - `/path/to/db.db` -> `/path/to/db.treedb`
/// - `/path/to/db.treedb` -> `/path/to/db.treedb` (unchanged)
pub fn normalize_store_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();

    if path.extension().and_then(|s| s.to_str()) == Some(STORE_EXTENSION) {
        return path.to_path_buf();
    }

    if path.extension().is_some() {
        return path.with_extension(STORE_EXTENSION);
    }

    let mut new_path = path.to_path_buf();
    let new_filename = format!(
        "{}.{}",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("tree"),
        STORE_EXTENSION
    );
    new_path.set_file_name(new_filename);
    new_path
}

/// Log level from `TREEDB_LOG`, `info` when unset or unparsable
pub fn log_level() -> tracing::Level {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| tracing::Level::from_str(v.trim()).ok())
        .unwrap_or(tracing::Level::INFO)
}
