//! Document: the locked façade over one tree, its history and its store
//!
//! Every public method holds the document mutex for its whole duration, so
//! graph mutation and history bookkeeping never interleave between callers.
//! Store I/O done inside a call blocks all other calls on the same document.

use std::sync::{Arc, Mutex};

use crate::command::{Command, CommandContext, CommandLog};
use crate::diagnostics::DiagnosticSink;
use crate::error::{GraphError, Result};
use crate::graph::{NodeId, TreeGraph};
use crate::storage::{NodeData, NodeStore};

struct DocumentState {
    graph: TreeGraph,
    log: CommandLog,
    store: Box<dyn NodeStore>,
    sink: Arc<dyn DiagnosticSink>,
    /// Set once an invariant violation was observed
    poisoned: bool,
}

impl DocumentState {
    fn split(&mut self) -> (&mut CommandLog, CommandContext<'_>) {
        let DocumentState { graph, log, store, sink, .. } = self;
        let ctx = CommandContext {
            graph,
            store: &mut **store,
            sink: &**sink,
        };
        (log, ctx)
    }

    fn run(&mut self, command: Command) -> Result<bool> {
        let (log, mut ctx) = self.split();
        log.run(command, &mut ctx)
    }
}

/// Thread-safe handle to one tree database.
pub struct Document {
    state: Mutex<DocumentState>,
}

impl Document {
    /// Load every record from `store` and index it.
    pub fn open<S>(store: S, sink: Arc<dyn DiagnosticSink>) -> Result<Self>
    where
        S: NodeStore + 'static,
    {
        let snapshot = store.read_all()?;
        let graph = TreeGraph::from_snapshot(&snapshot);
        sink.info(&format!("Opened document with {} nodes", graph.node_count()));
        Ok(Self::from_parts(graph, Box::new(store), sink))
    }

    /// Start a document holding only `root`, persisting it if the store
    /// does not have it yet.
    pub fn with_root<S>(mut store: S, root: NodeData, sink: Arc<dyn DiagnosticSink>) -> Result<Self>
    where
        S: NodeStore + 'static,
    {
        let root = NodeData { parent_ids: Vec::new(), ..root };
        if store.read(root.id)?.is_none() {
            store.write(&root)?;
        }
        let graph = TreeGraph::from_root(&root);
        sink.info(&format!("Created document with root {}", root.id));
        Ok(Self::from_parts(graph, Box::new(store), sink))
    }

    fn from_parts(graph: TreeGraph, store: Box<dyn NodeStore>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                graph,
                log: CommandLog::new(),
                store,
                sink,
                poisoned: false,
            }),
        }
    }

    /// Run `f` under the lock. Invariant violations poison the document.
    fn with_state<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DocumentState) -> Result<T>,
    {
        let mut state = self.state.lock().map_err(|_| GraphError::LockPoisoned)?;
        if state.poisoned {
            return Err(GraphError::Poisoned);
        }

        let result = f(&mut state);
        if let Err(e) = &result {
            if e.is_invariant_violation() {
                state.poisoned = true;
                state.sink.error(&format!("Invariant violation, document is no longer usable: {}", e));
            }
        }
        result
    }

    // === MUTATIONS ===

    pub fn create(&self, data: NodeData) -> Result<bool> {
        self.with_state(|state| state.run(Command::Create(data)))
    }

    /// Insert an unordered set of nodes as one command
    pub fn batch_create(&self, batch: Vec<NodeData>) -> Result<bool> {
        self.with_state(|state| state.run(Command::BatchCreate(batch)))
    }

    /// Delete a node and its subtree
    pub fn delete(&self, id: NodeId) -> Result<bool> {
        self.with_state(|state| state.run(Command::delete(id)))
    }

    /// Delete each id on its own, one history entry per successful delete.
    ///
    /// Keeps going past ids that cannot be deleted; the result is true only
    /// if every delete succeeded.
    pub fn delete_many(&self, ids: &[NodeId]) -> Result<bool> {
        self.with_state(|state| {
            let mut all = true;
            for &id in ids {
                all &= state.run(Command::delete(id))?;
            }
            Ok(all)
        })
    }

    /// Record a no-op, e.g. to mark a transaction boundary
    pub fn add_empty_command(&self) -> Result<bool> {
        self.with_state(|state| state.run(Command::Empty))
    }

    // === HISTORY ===

    pub fn begin_transaction(&self) -> Result<bool> {
        self.with_state(|state| Ok(state.log.begin_transaction()))
    }

    pub fn commit(&self) -> Result<bool> {
        self.with_state(|state| Ok(state.log.commit()))
    }

    pub fn rollback(&self) -> Result<bool> {
        self.with_state(|state| {
            let (log, mut ctx) = state.split();
            log.rollback(&mut ctx)
        })
    }

    pub fn undo(&self) -> Result<bool> {
        self.with_state(|state| {
            let (log, mut ctx) = state.split();
            log.undo(&mut ctx)
        })
    }

    pub fn redo(&self) -> Result<bool> {
        self.with_state(|state| {
            let (log, mut ctx) = state.split();
            log.redo(&mut ctx)
        })
    }

    pub fn clear_undo_redo(&self) -> Result<()> {
        self.with_state(|state| {
            if state.log.is_in_transaction() {
                state.sink.warn("Clearing undo/redo history inside an open transaction");
            }
            state.log.clear_history();
            Ok(())
        })
    }

    pub fn get_undo_stack_count(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.log.undo_count()))
    }

    pub fn get_redo_stack_count(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.log.redo_count()))
    }

    pub fn can_undo(&self) -> Result<bool> {
        self.with_state(|state| Ok(state.log.undo_count() > 0))
    }

    pub fn can_redo(&self) -> Result<bool> {
        self.with_state(|state| Ok(state.log.redo_count() > 0))
    }

    pub fn is_in_transaction(&self) -> Result<bool> {
        self.with_state(|state| Ok(state.log.is_in_transaction()))
    }

    // === QUERIES ===

    /// Stored record of a node that is in the tree
    pub fn get_node(&self, id: NodeId) -> Result<Option<NodeData>> {
        self.with_state(|state| {
            if !state.graph.is_node_exist(id) {
                return Ok(None);
            }
            state.store.read(id)
        })
    }

    /// Live children of `id`, `None` if `id` is not in the tree
    pub fn get_children_in_tree(&self, id: NodeId) -> Result<Option<Vec<NodeId>>> {
        self.with_state(|state| {
            if !state.graph.is_node_exist(id) {
                return Ok(None);
            }
            Ok(Some(state.graph.get_children_node_ids(id)))
        })
    }

    /// Present in both the tree and the store
    pub fn is_node_in_tree(&self, id: NodeId) -> Result<bool> {
        self.with_state(|state| {
            if !state.graph.is_node_exist(id) {
                return Ok(false);
            }
            Ok(state.store.read(id)?.is_some())
        })
    }

    pub fn get_parent_ids(&self, id: NodeId) -> Result<Option<Vec<NodeId>>> {
        self.with_state(|state| Ok(state.graph.get_parent_ids(id).map(<[NodeId]>::to_vec)))
    }

    pub fn root_ids(&self) -> Result<Vec<NodeId>> {
        self.with_state(|state| Ok(state.graph.root_ids()))
    }

    pub fn node_count(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.graph.node_count()))
    }

    /// Search the subtree rooted at `root` for `target`
    pub fn find_in_subtree(&self, root: NodeId, target: NodeId) -> Result<Option<NodeId>> {
        self.with_state(|state| Ok(state.graph.find_in_subtree(root, target)))
    }

    // === STORE ===

    pub fn get_database_bytes(&self) -> Result<Vec<u8>> {
        self.with_state(|state| state.store.get_bytes())
    }

    pub fn dispose(&self) -> Result<()> {
        self.with_state(|state| {
            state.store.dispose()?;
            state.sink.info("Document disposed");
            Ok(())
        })
    }
}
