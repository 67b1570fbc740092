//! Tree traversal algorithms
//!
//! All walkers take a `get_children` closure so they can run over any
//! adjacency source. The depth-first walkers use a scoped cycle guard: the
//! current path is kept on an explicit stack, a node already on the path
//! ends that branch only, and the id is popped again on every exit. A node
//! reachable through two different paths is therefore visited twice.

use std::collections::HashSet;

use super::NodeId;

/// Breadth-first walk of everything reachable from `start`, each node once.
///
/// The output doubles as the work queue: `next` is the first entry whose
/// children have not been expanded yet.
pub fn bfs<F>(start: NodeId, mut get_children: F) -> Vec<NodeId>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut seen = HashSet::from([start]);
    let mut order = vec![start];
    let mut next = 0;

    while let Some(&current) = order.get(next) {
        next += 1;
        for child in get_children(current) {
            if seen.insert(child) {
                order.push(child);
            }
        }
    }

    order
}

/// Depth-first search for `target` in the subtree rooted at `start`.
pub fn guarded_find<F>(start: NodeId, target: NodeId, mut get_children: F) -> Option<NodeId>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut path = Vec::new();
    find_on_path(start, target, &mut get_children, &mut path)
}

fn find_on_path<F>(
    current: NodeId,
    target: NodeId,
    get_children: &mut F,
    path: &mut Vec<NodeId>,
) -> Option<NodeId>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    if path.contains(&current) {
        return None;
    }
    if current == target {
        return Some(current);
    }

    path.push(current);
    let mut found = None;
    for child in get_children(current) {
        if let Some(hit) = find_on_path(child, target, get_children, path) {
            found = Some(hit);
            break;
        }
    }
    path.pop();

    found
}

/// Post-order walk of the subtree rooted at `start`.
///
/// Children come before their parent, deepest first; `start` is always the
/// last element. Duplicates from converging paths keep their first position.
pub fn guarded_post_order<F>(start: NodeId, mut get_children: F) -> Vec<NodeId>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut path = Vec::new();
    let mut order = Vec::new();
    post_order_on_path(start, &mut get_children, &mut path, &mut order);

    let mut seen = HashSet::with_capacity(order.len());
    order.retain(|id| seen.insert(*id));
    order
}

fn post_order_on_path<F>(
    current: NodeId,
    get_children: &mut F,
    path: &mut Vec<NodeId>,
    order: &mut Vec<NodeId>,
) where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    if path.contains(&current) {
        return;
    }

    path.push(current);
    for child in get_children(current) {
        post_order_on_path(child, get_children, path, order);
    }
    path.pop();

    order.push(current);
}
