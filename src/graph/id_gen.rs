//! Deterministic node IDs via BLAKE3

use blake3::Hasher;

use super::NodeId;

fn hash_to_id(hasher: &Hasher) -> NodeId {
    let hash = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[0..16]);
    u128::from_le_bytes(bytes)
}

/// Convert a string key to a node id
///
/// # Examples
/// ```
/// use treedb::graph::string_id_to_u128;
///
/// let id = string_id_to_u128("document:root");
/// assert_ne!(id, 0);
/// ```
pub fn string_id_to_u128(key: &str) -> NodeId {
    let mut hasher = Hasher::new();
    hasher.update(key.as_bytes());
    hash_to_id(&hasher)
}

/// Compute a deterministic child id
///
/// ID = BLAKE3(parent_le_bytes|name) -> first 16 bytes. The same name under
/// two different parents gives two different ids.
///
/// # Examples
/// ```
/// use treedb::graph::{compute_node_id, string_id_to_u128};
///
/// let root = string_id_to_u128("document:root");
/// let id = compute_node_id(root, "Body1");
/// assert_ne!(id, root);
/// ```
pub fn compute_node_id(parent: NodeId, name: &str) -> NodeId {
    let mut hasher = Hasher::new();
    hasher.update(&parent.to_le_bytes());
    hasher.update(b"|");
    hasher.update(name.as_bytes());
    hash_to_id(&hasher)
}
