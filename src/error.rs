//! Error types for the tree database

use thiserror::Error;

use crate::graph::NodeId;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors surfaced through `Result`.
///
/// Expected failures (duplicate ids, missing parents, unknown ids, misuse of
/// transactions) are never reported here: they come back as `false`/`None`.
/// The variants below are either store I/O problems or invariant violations
/// after which the graph can no longer be trusted.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node {0} has no parents: removing a root is not allowed")]
    RootRemoval(NodeId),

    #[error("Cascade delete from node {0} produced no ids")]
    EmptyCascade(NodeId),

    #[error("Cascade delete reported node {0} which is missing from the index")]
    IndexDiverged(NodeId),

    #[error("Undo failed: {0}")]
    UndoFailed(String),

    #[error("Graph and store diverged: {0}")]
    StoreDiverged(String),

    #[error("Document is poisoned by an earlier invariant violation")]
    Poisoned,

    #[error("Document lock poisoned")]
    LockPoisoned,

    #[error("Store has been disposed")]
    Disposed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),
}

impl GraphError {
    /// True for errors meaning the in-memory graph diverged from its index
    /// or from the store.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            GraphError::RootRemoval(_)
                | GraphError::EmptyCascade(_)
                | GraphError::IndexDiverged(_)
                | GraphError::UndoFailed(_)
                | GraphError::StoreDiverged(_)
        )
    }
}
