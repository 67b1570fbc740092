//! Graph nodes and the per-node algorithms
//!
//! Nodes live in an id-keyed arena (`NodeArena`) next to an `EdgeTable`.
//! The operations that walk from one node to others (`add_node`,
//! `found_node`, `cascade_delete_from_node`) take both tables so they can
//! follow and sever edges without holding references between nodes.

use std::collections::HashMap;

use super::connector::{EdgeId, EdgeTable};
use super::{traversal, NodeId};

/// Id → node index
pub type NodeArena = HashMap<NodeId, Node>;

/// One entry of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Declared parents, fixed at construction
    parent_ids: Vec<NodeId>,
    /// Outgoing edges; dead ones are pruned on the next `get_child_nodes`
    children: Vec<EdgeId>,
    /// Incoming edges, severed from this side during cascade delete
    parent_edges: Vec<EdgeId>,
}

impl Node {
    /// Create a node. Repeated parent ids keep their first occurrence.
    pub fn new(id: NodeId, parent_ids: &[NodeId]) -> Self {
        let mut unique = Vec::with_capacity(parent_ids.len());
        for &parent in parent_ids {
            if !unique.contains(&parent) {
                unique.push(parent);
            }
        }

        Self {
            id,
            parent_ids: unique,
            children: Vec::new(),
            parent_edges: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent_ids(&self) -> &[NodeId] {
        &self.parent_ids
    }

    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// `candidate` declares this node as one of its parents
    pub fn is_child(&self, candidate: &Node) -> bool {
        candidate.parent_ids.contains(&self.id)
    }

    /// Children reachable through valid edges, without pruning
    pub fn live_children(&self, edges: &EdgeTable) -> Vec<NodeId> {
        self.children
            .iter()
            .filter_map(|&edge| edges.live_child(edge))
            .collect()
    }

    /// Drop dead edges from the child list, then return live children.
    pub fn get_child_nodes(&mut self, edges: &mut EdgeTable) -> Vec<NodeId> {
        self.children.retain(|&edge| {
            if edges.is_valid(edge) {
                true
            } else {
                edges.release(edge);
                false
            }
        });
        self.live_children(edges)
    }

    fn has_live_child(&self, child_id: NodeId, edges: &EdgeTable) -> bool {
        self.children
            .iter()
            .any(|&edge| edges.live_child(edge) == Some(child_id))
    }

    /// Cut every incoming edge from the child side
    fn sever_parent_edges(&mut self, edges: &mut EdgeTable) {
        for edge in self.parent_edges.drain(..) {
            if let Some(connector) = edges.get_mut(edge) {
                connector.disconnect_from_child();
            }
        }
    }

    /// Cut and release every outgoing edge
    fn clear_children(&mut self, edges: &mut EdgeTable) {
        for edge in self.children.drain(..) {
            if let Some(connector) = edges.get_mut(edge) {
                connector.disconnect_from_parent();
            }
            edges.release(edge);
        }
    }

    /// Detach this node from the tree in both directions.
    pub(crate) fn detach(&mut self, edges: &mut EdgeTable) {
        self.sever_parent_edges(edges);
        self.clear_children(edges);
    }
}

/// Link `child_id` under `parent_id`.
///
/// No-op unless the child declares the parent and the parent has no live
/// edge to that child id yet. Both ids must already be in the arena.
pub fn add_node(arena: &mut NodeArena, edges: &mut EdgeTable, parent_id: NodeId, child_id: NodeId) {
    let (Some(parent), Some(child)) = (arena.get(&parent_id), arena.get(&child_id)) else {
        return;
    };
    if !parent.is_child(child) || parent.has_live_child(child_id, edges) {
        return;
    }

    let edge = edges.connect(parent_id, child_id);
    if let Some(parent) = arena.get_mut(&parent_id) {
        parent.children.push(edge);
    }
    if let Some(child) = arena.get_mut(&child_id) {
        child.parent_edges.push(edge);
    }
}

/// Find `target_id` in the subtree rooted at `start` (inclusive).
pub fn found_node(arena: &NodeArena, edges: &EdgeTable, start: NodeId, target_id: NodeId) -> Option<NodeId> {
    if !arena.contains_key(&start) {
        return None;
    }
    traversal::guarded_find(start, target_id, |id| children_of(arena, edges, id))
}

/// Collect `start` and everything below it, deepest first, and detach them.
///
/// Every returned node has its parent-side edges severed and its child list
/// cleared. The nodes stay in the arena; removing them from the index is the
/// caller's job. Returns an empty list only if `start` is unknown.
pub fn cascade_delete_from_node(arena: &mut NodeArena, edges: &mut EdgeTable, start: NodeId) -> Vec<NodeId> {
    if !arena.contains_key(&start) {
        return Vec::new();
    }

    let order = traversal::guarded_post_order(start, |id| children_of(arena, edges, id));

    for id in &order {
        if let Some(node) = arena.get_mut(id) {
            node.detach(edges);
        }
    }

    order
}

fn children_of(arena: &NodeArena, edges: &EdgeTable, id: NodeId) -> Vec<NodeId> {
    arena
        .get(&id)
        .map(|node| node.live_children(edges))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with(nodes: &[(NodeId, &[NodeId])]) -> (NodeArena, EdgeTable) {
        let mut arena = NodeArena::new();
        let mut edges = EdgeTable::new();
        for &(id, parents) in nodes {
            arena.insert(id, Node::new(id, parents));
        }
        for &(id, parents) in nodes {
            for &parent in parents {
                add_node(&mut arena, &mut edges, parent, id);
            }
        }
        (arena, edges)
    }

    #[test]
    fn test_new_dedups_parent_ids() {
        let node = Node::new(5, &[1, 2, 1, 3, 2]);
        assert_eq!(node.parent_ids(), &[1, 2, 3]);
        assert!(!node.is_root());
        assert!(Node::new(1, &[]).is_root());
    }

    #[test]
    fn test_is_child() {
        let parent = Node::new(1, &[]);
        let child = Node::new(2, &[1]);
        let stranger = Node::new(3, &[7]);

        assert!(parent.is_child(&child));
        assert!(!parent.is_child(&stranger));
        assert!(!child.is_child(&parent));
    }

    #[test]
    fn test_add_node_requires_declared_parent() {
        let (mut arena, mut edges) = arena_with(&[(1, &[]), (2, &[1]), (3, &[])]);

        add_node(&mut arena, &mut edges, 1, 3);

        assert_eq!(arena[&1].live_children(&edges), vec![2]);
    }

    #[test]
    fn test_add_node_dedups_by_child_id() {
        let (mut arena, mut edges) = arena_with(&[(1, &[]), (2, &[1])]);

        add_node(&mut arena, &mut edges, 1, 2);
        add_node(&mut arena, &mut edges, 1, 2);

        assert_eq!(arena[&1].live_children(&edges), vec![2]);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_get_child_nodes_prunes_severed_edges() {
        let (mut arena, mut edges) = arena_with(&[(1, &[]), (2, &[1]), (3, &[1])]);

        arena.get_mut(&2).unwrap().sever_parent_edges(&mut edges);
        assert_eq!(edges.len(), 2);

        let children = arena.get_mut(&1).unwrap().get_child_nodes(&mut edges);
        assert_eq!(children, vec![3]);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_found_node() {
        let (arena, edges) = arena_with(&[(1, &[]), (2, &[1]), (3, &[2]), (4, &[1])]);

        assert_eq!(found_node(&arena, &edges, 1, 3), Some(3));
        assert_eq!(found_node(&arena, &edges, 4, 3), None);
        assert_eq!(found_node(&arena, &edges, 99, 3), None);
    }

    #[test]
    fn test_found_node_on_cycle() {
        // Only reachable from a snapshot: 1 and 2 declare each other
        let (arena, edges) = arena_with(&[(1, &[2]), (2, &[1])]);

        assert_eq!(found_node(&arena, &edges, 1, 2), Some(2));
        assert_eq!(found_node(&arena, &edges, 1, 42), None);
    }

    #[test]
    fn test_cascade_delete_from_node() {
        // 1 -> 2 -> 3, 1 -> 4
        let (mut arena, mut edges) = arena_with(&[(1, &[]), (2, &[1]), (3, &[2]), (4, &[1])]);

        let removed = cascade_delete_from_node(&mut arena, &mut edges, 2);

        assert_eq!(removed, vec![3, 2]);
        // Surviving parent no longer sees the removed child
        assert_eq!(arena.get_mut(&1).unwrap().get_child_nodes(&mut edges), vec![4]);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_cascade_delete_multi_parent_child_is_removed() {
        // 3 declares both 1 and 2; cascading from 2 still takes 3
        let (mut arena, mut edges) = arena_with(&[(0, &[]), (1, &[0]), (2, &[0]), (3, &[1, 2])]);

        let removed = cascade_delete_from_node(&mut arena, &mut edges, 2);

        assert_eq!(removed, vec![3, 2]);
        assert!(arena.get_mut(&1).unwrap().get_child_nodes(&mut edges).is_empty());
    }
}
