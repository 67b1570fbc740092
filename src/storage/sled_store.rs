//! Persistent node store on sled
//!
//! Layout of a store directory:
//! - `nodes/`: sled tree, key = id (16 bytes BE), value = bincode(NodeData)
//! - `metadata.json`: `StoreMetadata`, rewritten on flush

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::{normalize_store_path, StoreConfig};
use crate::error::{GraphError, Result};
use crate::graph::NodeId;
use super::{encode_snapshot, NodeData, NodeStore};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn key(id: NodeId) -> [u8; 16] {
    id.to_be_bytes()
}

/// Store metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub version: String,
    pub node_count: usize,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        let now = now_secs();
        Self {
            version: "1.0".to_string(),
            node_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

pub struct SledStore {
    path: PathBuf,
    db: Option<sled::Db>,
    metadata: StoreMetadata,
    flush_on_write: bool,
}

impl SledStore {
    /// Open or create the store described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = normalize_store_path(&config.path);
        fs::create_dir_all(&path)?;

        let db = sled::Config::new()
            .path(path.join("nodes"))
            .cache_capacity(config.cache_capacity)
            .open()
            .map_err(|e| GraphError::Storage(format!("Failed to open sled: {}", e)))?;

        let meta_path = path.join("metadata.json");
        let metadata = if meta_path.exists() {
            let file = File::open(&meta_path)?;
            serde_json::from_reader(file).unwrap_or_else(|e| {
                tracing::warn!("Unreadable {:?} ({}), starting from default metadata", meta_path, e);
                StoreMetadata::default()
            })
        } else {
            StoreMetadata::default()
        };

        tracing::info!("Opened node store at {:?}: {} nodes", path, db.len());

        Ok(Self {
            path,
            db: Some(db),
            metadata,
            flush_on_write: config.flush_on_write,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.db()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.db()?.is_empty())
    }

    /// Flush sled and rewrite `metadata.json`
    pub fn flush(&mut self) -> Result<()> {
        let db = self.db()?;
        db.flush()
            .map_err(|e| GraphError::Storage(format!("Failed to flush: {}", e)))?;
        let node_count = db.len();

        self.metadata.node_count = node_count;
        self.metadata.updated_at = now_secs();
        let file = File::create(self.path.join("metadata.json"))?;
        serde_json::to_writer_pretty(file, &self.metadata)?;

        tracing::debug!("Flushed node store at {:?}: {} nodes", self.path, node_count);
        Ok(())
    }

    fn db(&self) -> Result<&sled::Db> {
        self.db.as_ref().ok_or(GraphError::Disposed)
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.flush_on_write {
            self.flush()?;
        }
        Ok(())
    }
}

impl NodeStore for SledStore {
    fn read_all(&self) -> Result<Vec<NodeData>> {
        let db = self.db()?;
        let mut nodes = Vec::with_capacity(db.len());
        for entry in db.iter() {
            let (_, value) = entry
                .map_err(|e| GraphError::Storage(format!("Failed to scan nodes: {}", e)))?;
            nodes.push(bincode::deserialize(&value)?);
        }
        Ok(nodes)
    }

    fn read(&self, id: NodeId) -> Result<Option<NodeData>> {
        let value = self
            .db()?
            .get(key(id))
            .map_err(|e| GraphError::Storage(format!("Failed to read node {}: {}", id, e)))?;

        match value {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&mut self, data: &NodeData) -> Result<()> {
        let value = bincode::serialize(data)?;
        self.db()?
            .insert(key(data.id), value)
            .map_err(|e| GraphError::Storage(format!("Failed to write node {}: {}", data.id, e)))?;
        self.maybe_flush()
    }

    fn remove(&mut self, id: NodeId) -> Result<()> {
        self.db()?
            .remove(key(id))
            .map_err(|e| GraphError::Storage(format!("Failed to remove node {}: {}", id, e)))?;
        self.maybe_flush()
    }

    fn get_bytes(&self) -> Result<Vec<u8>> {
        encode_snapshot(&self.read_all()?)
    }

    fn dispose(&mut self) -> Result<()> {
        if self.db.is_none() {
            return Ok(());
        }
        self.flush()?;
        self.db = None;
        tracing::info!("Disposed node store at {:?}", self.path);
        Ok(())
    }
}
