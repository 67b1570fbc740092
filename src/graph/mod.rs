//! Node graph: connectors, nodes and the id-indexed tree

pub mod connector;
pub mod node;
pub mod engine;
pub mod traversal;
pub mod id_gen;

pub use connector::{Connector, EdgeId, EdgeTable};
pub use node::Node;
pub use engine::TreeGraph;
pub use id_gen::{compute_node_id, string_id_to_u128};

/// Unique node key
pub type NodeId = u128;
