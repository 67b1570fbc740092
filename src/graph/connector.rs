//! Parent→child edges stored in an id-keyed table
//!
//! A node never owns another node. It holds `EdgeId`s, and each edge records
//! its two endpoints. Either endpoint can clear its own side in O(1) without
//! touching the other node's edge list; the parent drops dead edges lazily
//! the next time it enumerates its children.

use std::collections::HashMap;

use super::NodeId;

/// Edge key inside an `EdgeTable`
pub type EdgeId = u64;

/// One directed parent→child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connector {
    parent: Option<NodeId>,
    child: Option<NodeId>,
}

impl Connector {
    pub fn new(parent: NodeId, child: NodeId) -> Self {
        Self {
            parent: Some(parent),
            child: Some(child),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    /// Both endpoints are still attached
    pub fn is_valid(&self) -> bool {
        self.parent.is_some() && self.child.is_some()
    }

    /// Called by the child endpoint: forget the child side only.
    pub fn disconnect_from_child(&mut self) {
        self.child = None;
    }

    /// Called by the parent endpoint: forget the parent side only.
    pub fn disconnect_from_parent(&mut self) {
        self.parent = None;
    }
}

/// Arena of connectors addressed by `EdgeId`.
#[derive(Debug, Default)]
pub struct EdgeTable {
    edges: HashMap<EdgeId, Connector>,
    next_id: EdgeId,
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new valid edge
    pub fn connect(&mut self, parent: NodeId, child: NodeId) -> EdgeId {
        let id = self.next_id;
        self.next_id += 1;
        self.edges.insert(id, Connector::new(parent, child));
        id
    }

    pub fn get(&self, id: EdgeId) -> Option<&Connector> {
        self.edges.get(&id)
    }

    pub fn get_mut(&mut self, id: EdgeId) -> Option<&mut Connector> {
        self.edges.get_mut(&id)
    }

    /// Missing edges count as invalid
    pub fn is_valid(&self, id: EdgeId) -> bool {
        self.edges.get(&id).map_or(false, Connector::is_valid)
    }

    /// Child endpoint of a valid edge
    pub fn live_child(&self, id: EdgeId) -> Option<NodeId> {
        self.edges
            .get(&id)
            .filter(|c| c.is_valid())
            .and_then(Connector::child)
    }

    /// Drop an edge from the table entirely
    pub fn release(&mut self, id: EdgeId) -> Option<Connector> {
        self.edges.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_validity() {
        let mut c = Connector::new(1, 2);
        assert!(c.is_valid());

        c.disconnect_from_child();
        assert!(!c.is_valid());
        assert_eq!(c.parent(), Some(1));
        assert_eq!(c.child(), None);
    }

    #[test]
    fn test_disconnect_from_parent_keeps_child() {
        let mut c = Connector::new(1, 2);
        c.disconnect_from_parent();
        assert!(!c.is_valid());
        assert_eq!(c.parent(), None);
        assert_eq!(c.child(), Some(2));
    }

    #[test]
    fn test_edge_table_severing_is_visible_through_id() {
        let mut table = EdgeTable::new();
        let a = table.connect(1, 2);
        let b = table.connect(1, 3);
        assert_ne!(a, b);
        assert_eq!(table.live_child(a), Some(2));

        table.get_mut(a).unwrap().disconnect_from_child();
        assert!(!table.is_valid(a));
        assert_eq!(table.live_child(a), None);
        assert!(table.is_valid(b));

        assert!(table.release(a).is_some());
        assert!(!table.is_valid(a));
        assert_eq!(table.len(), 1);
    }
}
