//! TreeGraph: id-indexed node tree with edge table

use crate::error::{GraphError, Result};
use crate::storage::NodeData;
use super::connector::EdgeTable;
use super::node::{self, Node, NodeArena};
use super::{traversal, NodeId};

/// In-memory index over the persisted nodes.
///
/// Every node except a root declares at least one parent, and parents are
/// always present before their children are accepted.
#[derive(Debug, Default)]
pub struct TreeGraph {
    nodes: NodeArena,
    edges: EdgeTable,
}

impl TreeGraph {
    /// Build from a full store snapshot.
    ///
    /// All nodes are indexed first, then every declared parent→child edge is
    /// connected in a single pass. Parents missing from the snapshot are
    /// skipped with a warning; the child stays in the index.
    pub fn from_snapshot(snapshot: &[NodeData]) -> Self {
        let mut graph = Self::default();

        for data in snapshot {
            if graph.nodes.contains_key(&data.id) {
                tracing::warn!("Duplicate node {} in snapshot, keeping the first copy", data.id);
                continue;
            }
            graph.nodes.insert(data.id, Node::new(data.id, &data.parent_ids));
        }

        let mut dangling = 0usize;
        for data in snapshot {
            for &parent_id in &data.parent_ids {
                if !graph.nodes.contains_key(&parent_id) {
                    tracing::warn!("Node {} declares parent {} which is not in the snapshot", data.id, parent_id);
                    dangling += 1;
                    continue;
                }
                node::add_node(&mut graph.nodes, &mut graph.edges, parent_id, data.id);
            }
        }

        tracing::info!(
            "Loaded tree from snapshot: {} nodes, {} edges, {} dangling parent refs",
            graph.nodes.len(),
            graph.edges.len(),
            dangling
        );

        graph
    }

    /// Graph holding a single parentless node
    pub fn from_root(root: &NodeData) -> Self {
        if !root.parent_ids.is_empty() {
            tracing::warn!("Root {} declares parents; they are ignored", root.id);
        }

        let mut graph = Self::default();
        graph.nodes.insert(root.id, Node::new(root.id, &[]));
        graph
    }

    pub fn is_node_exist(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_parent_ids(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&id).map(Node::parent_ids)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edge slots, including severed edges not yet pruned
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Parentless nodes, sorted by id
    pub fn root_ids(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.is_root())
            .map(Node::id)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Live children of `parent_id`, pruning dead edges on the way.
    ///
    /// # Panics
    ///
    /// If `parent_id` is not in the graph. Check `is_node_exist` first.
    pub fn get_children_node_ids(&mut self, parent_id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes.get_mut(&parent_id) else {
            panic!("get_children_node_ids: node {} is not in the graph", parent_id);
        };
        parent.get_child_nodes(&mut self.edges)
    }

    /// Search the subtree rooted at `root` for `target`
    pub fn find_in_subtree(&self, root: NodeId, target: NodeId) -> Option<NodeId> {
        node::found_node(&self.nodes, &self.edges, root, target)
    }

    /// `id` and everything below it, level by level
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        if !self.is_node_exist(id) {
            return Vec::new();
        }
        traversal::bfs(id, |current| {
            self.nodes
                .get(&current)
                .map(|n| n.live_children(&self.edges))
                .unwrap_or_default()
        })
    }

    /// Insert one node under its declared parents.
    ///
    /// Rejected without mutation when the id already exists, when no parent
    /// is declared, or when any declared parent is missing.
    pub fn add_new_node(&mut self, data: &NodeData) -> bool {
        if self.nodes.contains_key(&data.id) {
            tracing::debug!("add_new_node: node {} already exists", data.id);
            return false;
        }
        if data.parent_ids.is_empty() {
            tracing::debug!("add_new_node: node {} declares no parent", data.id);
            return false;
        }
        if let Some(missing) = data.parent_ids.iter().find(|&&p| !self.nodes.contains_key(&p)) {
            tracing::debug!("add_new_node: parent {} of node {} is missing", missing, data.id);
            return false;
        }

        let new_node = Node::new(data.id, &data.parent_ids);
        let parents = new_node.parent_ids().to_vec();
        self.nodes.insert(data.id, new_node);
        for parent_id in parents {
            node::add_node(&mut self.nodes, &mut self.edges, parent_id, data.id);
        }

        true
    }

    /// Insert an unordered set of nodes.
    ///
    /// Pending nodes are retried pass after pass until all are in or a pass
    /// adds nothing. In the latter case every node added by this call is
    /// taken out again, so the graph is left as it was.
    pub fn batch_add_new_node(&mut self, batch: &[NodeData]) -> bool {
        let mut pending: Vec<&NodeData> = batch.iter().collect();
        let mut added: Vec<NodeId> = Vec::with_capacity(batch.len());
        let mut passes = 0usize;

        while !pending.is_empty() {
            passes += 1;
            let before = pending.len();
            pending.retain(|data| {
                if self.add_new_node(data) {
                    added.push(data.id);
                    false
                } else {
                    true
                }
            });

            if pending.len() == before {
                tracing::debug!(
                    "batch_add_new_node: no progress on pass {} with {} pending, rolling back {} nodes",
                    passes,
                    pending.len(),
                    added.len()
                );
                for id in added.iter().rev() {
                    self.unlink(*id);
                }
                return false;
            }
        }

        tracing::debug!("batch_add_new_node: {} nodes in {} passes", added.len(), passes);
        true
    }

    /// Remove a node and its whole subtree.
    ///
    /// `Ok(None)` when the id is unknown. Removing a root, an empty cascade
    /// result, or a cascade id missing from the index are invariant
    /// violations and come back as errors.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Option<Vec<NodeId>>> {
        let Some(target) = self.nodes.get(&id) else {
            return Ok(None);
        };
        if target.is_root() {
            tracing::error!("remove_node: node {} is a root", id);
            return Err(GraphError::RootRemoval(id));
        }

        let removed = node::cascade_delete_from_node(&mut self.nodes, &mut self.edges, id);
        if removed.is_empty() {
            tracing::error!("remove_node: cascade from {} returned nothing", id);
            return Err(GraphError::EmptyCascade(id));
        }

        for removed_id in &removed {
            if self.nodes.remove(removed_id).is_none() {
                tracing::error!("remove_node: cascaded node {} is not indexed", removed_id);
                return Err(GraphError::IndexDiverged(*removed_id));
            }
        }

        tracing::debug!("remove_node: {} removed {} nodes", id, removed.len());
        Ok(Some(removed))
    }

    /// Take a single node out of the index, cutting its edges both ways
    fn unlink(&mut self, id: NodeId) {
        if let Some(mut node) = self.nodes.remove(&id) {
            node.detach(&mut self.edges);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const R: NodeId = 1;
    const A: NodeId = 2;
    const B: NodeId = 3;
    const C: NodeId = 4;

    fn sample() -> TreeGraph {
        // R -> A -> C
        // R -> B
        let mut graph = TreeGraph::from_root(&NodeData::root(R));
        assert!(graph.add_new_node(&NodeData::new(A, [R])));
        assert!(graph.add_new_node(&NodeData::new(B, [R])));
        assert!(graph.add_new_node(&NodeData::new(C, [A])));
        graph
    }

    fn adjacency(graph: &mut TreeGraph) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut ids: Vec<NodeId> = graph.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| {
                let mut children = graph.get_children_node_ids(id);
                children.sort_unstable();
                (id, children)
            })
            .collect()
    }

    #[test]
    fn test_from_root() {
        let mut graph = TreeGraph::from_root(&NodeData::root(R));
        assert_eq!(graph.node_count(), 1);
        assert!(graph.is_node_exist(R));
        assert!(graph.get_children_node_ids(R).is_empty());
        assert_eq!(graph.root_ids(), vec![R]);
    }

    #[test]
    fn test_snapshot_matches_incremental_build() {
        let snapshot = vec![
            NodeData::new(C, [A]),
            NodeData::root(R),
            NodeData::new(B, [R]),
            NodeData::new(A, [R]),
        ];

        let mut from_snapshot = TreeGraph::from_snapshot(&snapshot);
        let mut incremental = sample();

        assert_eq!(adjacency(&mut from_snapshot), adjacency(&mut incremental));
    }

    #[test]
    fn test_snapshot_skips_missing_parent() {
        let snapshot = vec![NodeData::root(R), NodeData::new(A, [R, 77])];

        let mut graph = TreeGraph::from_snapshot(&snapshot);

        assert!(graph.is_node_exist(A));
        assert_eq!(graph.get_children_node_ids(R), vec![A]);
    }

    #[test]
    fn test_add_new_node_rejects_duplicate() {
        let mut graph = sample();
        let edges_before = graph.edge_count();

        assert!(!graph.add_new_node(&NodeData::new(C, [B])));

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), edges_before);
        assert!(graph.get_children_node_ids(B).is_empty());
    }

    #[test]
    fn test_add_new_node_rejects_missing_parent() {
        let mut graph = sample();

        assert!(!graph.add_new_node(&NodeData::new(10, [A, 99])));

        assert!(!graph.is_node_exist(10));
        assert_eq!(graph.get_children_node_ids(A), vec![C]);
    }

    #[test]
    fn test_add_new_node_rejects_parentless() {
        let mut graph = sample();
        assert!(!graph.add_new_node(&NodeData::root(10)));
        assert!(!graph.is_node_exist(10));
    }

    #[test]
    fn test_add_new_node_multi_parent() {
        let mut graph = sample();

        assert!(graph.add_new_node(&NodeData::new(10, [A, B])));

        assert_eq!(graph.get_children_node_ids(B), vec![10]);
        let mut under_a = graph.get_children_node_ids(A);
        under_a.sort_unstable();
        assert_eq!(under_a, vec![C, 10]);
    }

    #[test]
    fn test_batch_any_order() {
        let forward = [NodeData::new(A, [R]), NodeData::new(C, [A])];
        let backward = [NodeData::new(C, [A]), NodeData::new(A, [R])];

        for batch in [&forward[..], &backward[..]] {
            let mut graph = TreeGraph::from_root(&NodeData::root(R));
            assert!(graph.batch_add_new_node(batch));
            assert_eq!(graph.get_children_node_ids(R), vec![A]);
            assert_eq!(graph.get_children_node_ids(A), vec![C]);
        }
    }

    #[test]
    fn test_batch_cycle_fails_without_mutation() {
        let mut graph = TreeGraph::from_root(&NodeData::root(R));

        let batch = [NodeData::new(10, [11]), NodeData::new(11, [10])];
        assert!(!graph.batch_add_new_node(&batch));

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_batch_rolls_back_partial_progress() {
        let mut graph = TreeGraph::from_root(&NodeData::root(R));

        // A and C get in over two passes, then 12 never resolves
        let batch = [
            NodeData::new(C, [A]),
            NodeData::new(A, [R]),
            NodeData::new(12, [99]),
        ];
        assert!(!graph.batch_add_new_node(&batch));

        assert_eq!(graph.node_count(), 1);
        assert!(!graph.is_node_exist(A));
        assert!(!graph.is_node_exist(C));
        assert!(graph.get_children_node_ids(R).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = sample();

        let removed = graph.remove_node(A).unwrap().unwrap();

        assert_eq!(removed, vec![C, A]);
        assert!(!graph.is_node_exist(A));
        assert!(!graph.is_node_exist(C));
        assert!(graph.is_node_exist(B));
        assert!(graph.is_node_exist(R));
        assert_eq!(graph.get_children_node_ids(R), vec![B]);
    }

    #[test]
    fn test_remove_node_unknown() {
        let mut graph = sample();
        assert!(graph.remove_node(99).unwrap().is_none());
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_remove_root_is_fatal() {
        let mut graph = sample();

        let err = graph.remove_node(R).unwrap_err();

        assert!(matches!(err, GraphError::RootRemoval(R)));
        assert!(err.is_invariant_violation());
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_create_then_remove_restores_node_set() {
        let mut graph = sample();
        let mut before: Vec<NodeId> = graph.nodes.keys().copied().collect();
        before.sort_unstable();

        assert!(graph.add_new_node(&NodeData::new(20, [B])));
        assert_eq!(graph.remove_node(20).unwrap(), Some(vec![20]));

        let mut after: Vec<NodeId> = graph.nodes.keys().copied().collect();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn test_find_in_subtree_and_descendants() {
        let graph = sample();

        assert_eq!(graph.find_in_subtree(R, C), Some(C));
        assert_eq!(graph.find_in_subtree(B, C), None);
        assert_eq!(graph.descendants(A), vec![A, C]);
        assert!(graph.descendants(99).is_empty());
    }

    #[test]
    #[should_panic(expected = "not in the graph")]
    fn test_children_of_unknown_node_panics() {
        let mut graph = sample();
        graph.get_children_node_ids(99);
    }
}
