//! Reversible commands and their history

pub mod log;

pub use log::CommandLog;

use std::collections::HashSet;

use crate::diagnostics::DiagnosticSink;
use crate::error::{GraphError, Result};
use crate::graph::{NodeId, TreeGraph};
use crate::storage::{NodeData, NodeStore};

/// Everything a command touches while it runs.
pub struct CommandContext<'a> {
    pub graph: &'a mut TreeGraph,
    pub store: &'a mut dyn NodeStore,
    pub sink: &'a dyn DiagnosticSink,
}

/// One reversible unit of work.
///
/// `execute` returns `Ok(false)` for expected failures and leaves graph and
/// store untouched. `undo` is only ever called on a command whose last
/// `execute` succeeded, with the graph in the state that execute left it in.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(NodeData),
    /// Cascading delete; `removed` holds the records taken out by the last
    /// execute so undo can put them back.
    Delete { id: NodeId, removed: Vec<NodeData> },
    BatchCreate(Vec<NodeData>),
    /// No-op, used as an explicit marker in the history
    Empty,
    /// Ordered group executed and undone as one step
    Multi(Vec<Command>),
}

impl Command {
    pub fn delete(id: NodeId) -> Self {
        Command::Delete { id, removed: Vec::new() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Create(_) => "create",
            Command::Delete { .. } => "delete",
            Command::BatchCreate(_) => "batch_create",
            Command::Empty => "empty",
            Command::Multi(_) => "multi",
        }
    }

    pub fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        match self {
            Command::Create(data) => {
                if !ctx.graph.add_new_node(data) {
                    ctx.sink.warn(&format!("Create rejected: node {} is a duplicate or misses a parent", data.id));
                    return Ok(false);
                }
                if let Err(e) = ctx.store.write(data) {
                    ctx.graph.remove_node(data.id)?;
                    return Err(e);
                }
                Ok(true)
            }

            Command::Delete { id, removed } => {
                if !ctx.graph.is_node_exist(*id) {
                    ctx.sink.warn(&format!("Delete rejected: node {} is not in the tree", id));
                    return Ok(false);
                }

                // Everything the cascade takes is captured before either side changes
                let subtree = ctx.graph.descendants(*id);
                let mut links = Vec::with_capacity(subtree.len());
                let mut records = Vec::with_capacity(subtree.len());
                for &node_id in &subtree {
                    let parents = ctx.graph.get_parent_ids(node_id).unwrap_or_default().to_vec();
                    links.push(NodeData::new(node_id, parents));
                    match ctx.store.read(node_id)? {
                        Some(data) => records.push(data),
                        None => ctx.sink.warn(&format!(
                            "Node {} was in the tree but not in the store; undo cannot restore it",
                            node_id
                        )),
                    }
                }

                let Some(ids) = ctx.graph.remove_node(*id)? else {
                    return Ok(false);
                };
                for (done, &removed_id) in ids.iter().enumerate() {
                    if let Err(e) = ctx.store.remove(removed_id) {
                        ctx.sink.warn(&format!("Store failed while deleting {}, restoring {} nodes", id, links.len()));
                        restore_deleted(ctx, &links, &records, &ids[..done])?;
                        return Err(e);
                    }
                }

                *removed = records;
                Ok(true)
            }

            Command::BatchCreate(batch) => {
                if !ctx.graph.batch_add_new_node(batch) {
                    ctx.sink.warn(&format!("Batch create of {} nodes did not converge", batch.len()));
                    return Ok(false);
                }
                for (done, data) in batch.iter().enumerate() {
                    if let Err(e) = ctx.store.write(data) {
                        ctx.sink.warn(&format!("Store failed on node {}, unwinding batch of {}", data.id, batch.len()));
                        unwind_batch(ctx, batch, &batch[..done])?;
                        return Err(e);
                    }
                }
                Ok(true)
            }

            Command::Empty => Ok(true),

            Command::Multi(commands) => {
                for i in 0..commands.len() {
                    let outcome = commands[i].execute(ctx);
                    if !matches!(outcome, Ok(true)) {
                        for done in commands[..i].iter_mut().rev() {
                            done.undo(ctx)?;
                        }
                        return outcome;
                    }
                }
                Ok(true)
            }
        }
    }

    pub fn undo(&mut self, ctx: &mut CommandContext<'_>) -> Result<()> {
        match self {
            Command::Create(data) => {
                if ctx.graph.remove_node(data.id)?.is_none() {
                    return Err(GraphError::UndoFailed(format!(
                        "created node {} is no longer in the tree",
                        data.id
                    )));
                }
                ctx.store.remove(data.id).map_err(undo_failed)
            }

            Command::Delete { id, removed } => {
                let restorable = resolvable(ctx, removed);
                if restorable.is_empty() {
                    ctx.sink.warn(&format!("Nothing recorded to restore for deleted node {}", id));
                    return Ok(());
                }
                if !ctx.graph.batch_add_new_node(&restorable) {
                    return Err(GraphError::UndoFailed(format!(
                        "could not restore the {} nodes deleted from {}",
                        restorable.len(),
                        id
                    )));
                }
                for data in &restorable {
                    ctx.store.write(data).map_err(undo_failed)?;
                }
                Ok(())
            }

            Command::BatchCreate(batch) => {
                // A cascade from an earlier entry may already have taken later ones
                for data in batch.iter().rev() {
                    if ctx.graph.is_node_exist(data.id) {
                        ctx.graph.remove_node(data.id)?;
                    }
                    ctx.store.remove(data.id).map_err(undo_failed)?;
                }
                Ok(())
            }

            Command::Empty => Ok(()),

            Command::Multi(commands) => {
                for command in commands.iter_mut().rev() {
                    command.undo(ctx)?;
                }
                Ok(())
            }
        }
    }
}

/// A store error during undo leaves graph and store out of step
fn undo_failed(e: GraphError) -> GraphError {
    GraphError::UndoFailed(format!("store: {}", e))
}

/// Put a failed delete back: re-link every cascaded node, then re-write the
/// records already taken out of the store.
fn restore_deleted(
    ctx: &mut CommandContext<'_>,
    links: &[NodeData],
    records: &[NodeData],
    taken: &[NodeId],
) -> Result<()> {
    if !ctx.graph.batch_add_new_node(links) {
        return Err(GraphError::StoreDiverged(format!(
            "could not re-link {} nodes after a failed delete",
            links.len()
        )));
    }

    let taken: HashSet<NodeId> = taken.iter().copied().collect();
    for data in records.iter().filter(|d| taken.contains(&d.id)) {
        ctx.store.write(data).map_err(|e| {
            GraphError::StoreDiverged(format!("could not re-write node {}: {}", data.id, e))
        })?;
    }
    Ok(())
}

/// Take a half-persisted batch back out of graph and store
fn unwind_batch(ctx: &mut CommandContext<'_>, batch: &[NodeData], written: &[NodeData]) -> Result<()> {
    for data in batch.iter().rev() {
        if ctx.graph.is_node_exist(data.id) {
            ctx.graph.remove_node(data.id)?;
        }
    }
    for data in written {
        ctx.store.remove(data.id).map_err(|e| {
            GraphError::StoreDiverged(format!("could not remove node {}: {}", data.id, e))
        })?;
    }
    Ok(())
}

/// Deleted records whose parents resolve, either in the graph or among the
/// other records. The rest are dropped with a warning.
fn resolvable(ctx: &CommandContext<'_>, records: &[NodeData]) -> Vec<NodeData> {
    let mut known = HashSet::new();
    let mut pending: Vec<&NodeData> = records.iter().collect();
    let mut ready = Vec::with_capacity(records.len());

    loop {
        let before = pending.len();
        pending.retain(|data| {
            let linked = !data.parent_ids.is_empty()
                && data
                    .parent_ids
                    .iter()
                    .all(|p| known.contains(p) || ctx.graph.is_node_exist(*p));
            if linked {
                known.insert(data.id);
                ready.push((*data).clone());
            }
            !linked
        });
        if pending.len() == before {
            break;
        }
    }

    for data in pending {
        ctx.sink.warn(&format!(
            "Deleted node {} cannot be restored: its parents are gone from the store",
            data.id
        ));
    }
    ready
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::storage::MemoryStore;

    pub const ROOT: NodeId = 1;

    /// Memory store whose writes and removes of one id fail
    #[derive(Debug, Default)]
    pub struct FlakyStore {
        pub inner: MemoryStore,
        pub fail_on: Option<NodeId>,
    }

    impl FlakyStore {
        pub fn new(inner: MemoryStore, fail_on: Option<NodeId>) -> Self {
            Self { inner, fail_on }
        }

        fn check(&self, id: NodeId) -> Result<()> {
            if self.fail_on == Some(id) {
                return Err(GraphError::Storage(format!("disk gone at node {}", id)));
            }
            Ok(())
        }
    }

    impl NodeStore for FlakyStore {
        fn read_all(&self) -> Result<Vec<NodeData>> {
            self.inner.read_all()
        }

        fn read(&self, id: NodeId) -> Result<Option<NodeData>> {
            self.inner.read(id)
        }

        fn write(&mut self, data: &NodeData) -> Result<()> {
            self.check(data.id)?;
            self.inner.write(data)
        }

        fn remove(&mut self, id: NodeId) -> Result<()> {
            self.check(id)?;
            self.inner.remove(id)
        }

        fn get_bytes(&self) -> Result<Vec<u8>> {
            self.inner.get_bytes()
        }

        fn dispose(&mut self) -> Result<()> {
            self.inner.dispose()
        }
    }

    /// Root-only graph and matching store
    pub struct Fixture {
        pub graph: TreeGraph,
        pub store: FlakyStore,
        pub sink: MemorySink,
    }

    impl Fixture {
        pub fn new() -> Self {
            let root = NodeData::root(ROOT);
            Self {
                graph: TreeGraph::from_root(&root),
                store: FlakyStore::new(MemoryStore::from_nodes([root]), None),
                sink: MemorySink::new(),
            }
        }

        pub fn ctx(&mut self) -> CommandContext<'_> {
            CommandContext {
                graph: &mut self.graph,
                store: &mut self.store,
                sink: &self.sink,
            }
        }

        /// Ids present in both graph and store, sorted
        pub fn ids(&self) -> Vec<NodeId> {
            let mut ids: Vec<NodeId> = self
                .store
                .read_all()
                .unwrap()
                .into_iter()
                .map(|n| n.id)
                .filter(|id| self.graph.is_node_exist(*id))
                .collect();
            ids.sort_unstable();
            assert_eq!(ids.len(), self.graph.node_count(), "graph and store diverged");
            ids
        }
    }
}
