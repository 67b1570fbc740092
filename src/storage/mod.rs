//! Backing node stores

pub mod memory;
pub mod sled_store;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::{compute_node_id, NodeId};

pub use memory::MemoryStore;
pub use sled_store::{SledStore, StoreMetadata};

/// Magic number of a serialized snapshot
pub const MAGIC: [u8; 4] = *b"TRDB";

/// Snapshot format version
pub const FORMAT_VERSION: u16 = 1;

const HEADER_SIZE: usize = 4 + 2;

/// Node record as persisted in a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    /// Unique key
    pub id: NodeId,

    /// Declared parents, in declaration order
    pub parent_ids: Vec<NodeId>,

    /// Opaque domain content, never interpreted by the tree
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl NodeData {
    pub fn new(id: NodeId, parent_ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            id,
            parent_ids: parent_ids.into_iter().collect(),
            payload: Vec::new(),
        }
    }

    /// Parentless record
    pub fn root(id: NodeId) -> Self {
        Self::new(id, [])
    }

    /// Single-parent record whose id is derived from the parent and a name
    pub fn child_of(parent: NodeId, name: &str) -> Self {
        Self::new(compute_node_id(parent, name), [parent])
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// Persistent side of a document.
///
/// `read_all` must return a snapshot where every parent reference resolves
/// within the same snapshot.
pub trait NodeStore: Send {
    fn read_all(&self) -> Result<Vec<NodeData>>;

    fn read(&self, id: NodeId) -> Result<Option<NodeData>>;

    /// Insert or overwrite a record
    fn write(&mut self, data: &NodeData) -> Result<()>;

    /// Remove a record; unknown ids are ignored
    fn remove(&mut self, id: NodeId) -> Result<()>;

    /// Whole store serialized with `encode_snapshot`
    fn get_bytes(&self) -> Result<Vec<u8>>;

    /// Release the store; later calls fail with `GraphError::Disposed`
    fn dispose(&mut self) -> Result<()>;
}

/// Serialize records as `MAGIC | version | bincode(records)`.
pub fn encode_snapshot(nodes: &[NodeData]) -> Result<Vec<u8>> {
    let body = bincode::serialize(nodes)?;
    let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Inverse of `encode_snapshot`, validating the header
pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<NodeData>> {
    if bytes.len() < HEADER_SIZE {
        return Err(GraphError::InvalidFormat(format!(
            "snapshot is {} bytes, shorter than its header",
            bytes.len()
        )));
    }
    if bytes[0..4] != MAGIC {
        return Err(GraphError::InvalidFormat(format!(
            "bad magic number: {:?}",
            &bytes[0..4]
        )));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(GraphError::InvalidFormat(format!(
            "unsupported snapshot version: {}",
            version
        )));
    }

    Ok(bincode::deserialize(&bytes[HEADER_SIZE..])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_header_is_checked() {
        let nodes = vec![NodeData::root(1), NodeData::new(2, [1]).with_payload(b"box".to_vec())];
        let mut bytes = encode_snapshot(&nodes).unwrap();
        assert_eq!(&bytes[0..4], b"TRDB");
        assert_eq!(decode_snapshot(&bytes).unwrap(), nodes);

        bytes[0] = b'X';
        assert!(matches!(decode_snapshot(&bytes), Err(GraphError::InvalidFormat(_))));
        assert!(matches!(decode_snapshot(&[1, 2]), Err(GraphError::InvalidFormat(_))));
    }

    #[test]
    fn test_snapshot_rejects_unknown_version() {
        let mut bytes = encode_snapshot(&[NodeData::root(1)]).unwrap();
        bytes[4] = 9;
        assert!(matches!(decode_snapshot(&bytes), Err(GraphError::InvalidFormat(_))));
    }

    #[test]
    fn test_child_of_derives_id_from_parent() {
        let data = NodeData::child_of(5, "Sketch");
        assert_eq!(data.parent_ids, vec![5]);
        assert_eq!(data.id, compute_node_id(5, "Sketch"));
        assert!(data.payload.is_empty());
    }
}
