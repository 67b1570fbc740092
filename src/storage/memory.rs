//! In-process node store

use std::collections::BTreeMap;

use crate::error::{GraphError, Result};
use crate::graph::NodeId;
use super::{decode_snapshot, encode_snapshot, NodeData, NodeStore};

/// Map-backed store, ordered by id so snapshots are deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: BTreeMap<NodeId, NodeData>,
    disposed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeData>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            disposed: false,
        }
    }

    /// Rebuild a store from `get_bytes` output
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_nodes(decode_snapshot(bytes)?))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn check_open(&self) -> Result<()> {
        if self.disposed {
            return Err(GraphError::Disposed);
        }
        Ok(())
    }
}

impl NodeStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<NodeData>> {
        self.check_open()?;
        Ok(self.nodes.values().cloned().collect())
    }

    fn read(&self, id: NodeId) -> Result<Option<NodeData>> {
        self.check_open()?;
        Ok(self.nodes.get(&id).cloned())
    }

    fn write(&mut self, data: &NodeData) -> Result<()> {
        self.check_open()?;
        self.nodes.insert(data.id, data.clone());
        Ok(())
    }

    fn remove(&mut self, id: NodeId) -> Result<()> {
        self.check_open()?;
        self.nodes.remove(&id);
        Ok(())
    }

    fn get_bytes(&self) -> Result<Vec<u8>> {
        self.check_open()?;
        let nodes: Vec<NodeData> = self.nodes.values().cloned().collect();
        encode_snapshot(&nodes)
    }

    fn dispose(&mut self) -> Result<()> {
        self.nodes.clear();
        self.disposed = true;
        Ok(())
    }
}
