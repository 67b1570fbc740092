//! treedb - in-memory node tree over a persisted node store
//!
//! # Architecture
//!
//! - **Graph**: id → node index plus an edge table; parents always exist
//!   before their children
//! - **Connectors**: parent→child edges severable from either end, pruned
//!   lazily by the parent
//! - **Cascade delete**: removing a node removes its whole subtree
//! - **Command log**: linear undo/redo history with begin/commit/rollback
//! - **Document**: one mutex around graph, history and store
//!
//! # Usage example
//!
//! ```
//! use std::sync::Arc;
//! use treedb::{Document, MemoryStore, NodeData, TracingSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::with_root(MemoryStore::new(), NodeData::root(1), Arc::new(TracingSink))?;
//!
//! // Children may come in any order within a batch
//! doc.batch_create(vec![
//!     NodeData::new(3, [2]).with_payload(b"fillet".to_vec()),
//!     NodeData::new(2, [1]).with_payload(b"extrude".to_vec()),
//! ])?;
//!
//! doc.delete(2)?; // takes 3 with it
//! assert!(!doc.is_node_in_tree(3)?);
//!
//! doc.undo()?;
//! assert_eq!(doc.get_children_in_tree(2)?, Some(vec![3]));
//! # Ok(())
//! # }
//! ```

pub mod graph;
pub mod storage;
pub mod command;
pub mod document;
pub mod diagnostics;
pub mod config;
pub mod error;

pub use graph::{NodeId, TreeGraph};
pub use storage::{NodeData, NodeStore, MemoryStore, SledStore};
pub use command::{Command, CommandLog};
pub use document::Document;
pub use diagnostics::{DiagnosticSink, TracingSink, MemorySink};
pub use config::StoreConfig;
pub use error::{GraphError, Result};

// Re-export id helpers
pub use graph::{compute_node_id, string_id_to_u128};
