//! Graph storage: immutable nodes committed under a single writer lock.
//!
//! Nodes reach a graph only through a commit. A commit takes the drafts produced by the
//! registry, checks the requested name, assigns dense ids, interns unnamed constants and
//! inserts everything while holding the graph mutex. Every check runs before the first
//! insertion, so a failed commit leaves the graph untouched.
//!
//! ```text
//! GraphBuilder --normalize--> staged constants + NodeDraft
//!                                      |
//!                                      v
//!                     Graph::commit (one lock, all or nothing)
//! ```

mod node;
mod state;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::{GraphError, Result};

pub use node::{DraftInput, GraphId, Node, NodeDraft, NodeId, Value};
use state::GraphInner;

static GRAPH_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Owner of every node built for one model.
pub struct Graph {
    id: GraphId,
    inner: Mutex<GraphInner>,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            id: GraphId(GRAPH_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            inner: Mutex::new(GraphInner::new()),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, GraphInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// All nodes in commit order, which is also a topological order.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.lock().nodes.clone()
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        self.lock().get(id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<Node>> {
        let inner = self.lock();
        let id = *inner.names.get(name)?;
        inner.get(id).cloned()
    }

    /// `Parameter` nodes in commit order.
    pub fn parameters(&self) -> Vec<Arc<Node>> {
        let inner = self.lock();
        inner
            .parameters
            .iter()
            .filter_map(|id| inner.get(*id).cloned())
            .collect()
    }

    pub fn results(&self) -> Vec<Value> {
        self.lock().results.clone()
    }

    /// Marks `value` as a graph output.
    pub fn add_result(&self, value: &Value) -> Result<()> {
        self.check_owner(value.node())?;
        self.lock().results.push(value.clone());
        Ok(())
    }

    /// Renames a node. The id is unchanged; the previous name becomes free.
    pub fn set_name(&self, node: &Arc<Node>, name: impl Into<String>) -> Result<()> {
        self.check_owner(node)?;
        let name = name.into();
        let mut inner = self.lock();
        match inner.names.get(&name) {
            Some(id) if *id == node.id() => return Ok(()),
            Some(_) => return Err(GraphError::DuplicateName { name }),
            None => {}
        }
        let mut slot = node.name.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            inner.names.remove(&previous);
        }
        if let Some(literal) = node.literal() {
            if inner.constants.get(literal) == Some(&node.id()) {
                inner.constants.remove(literal);
            }
        }
        tracing::debug!(graph = self.id.0, node = node.id().0, name = %name, "renamed node");
        inner.names.insert(name.clone(), node.id());
        *slot = Some(name);
        Ok(())
    }

    /// Commits staged constants followed by `draft` as one atomic step.
    pub(crate) fn commit(
        &self,
        staged: Vec<NodeDraft>,
        draft: NodeDraft,
        name: Option<String>,
        intern: bool,
    ) -> Result<Arc<Node>> {
        let mut inner = self.lock();
        if let Some(name) = &name {
            if inner.name_taken(name) {
                return Err(GraphError::DuplicateName { name: name.clone() });
            }
        }
        for pending in &staged {
            self.check_inputs(pending, 0)?;
        }
        self.check_inputs(&draft, staged.len())?;

        let constants = staged
            .into_iter()
            .map(|pending| self.insert(&mut inner, pending, &[], None, intern))
            .collect::<Vec<_>>();
        Ok(self.insert(&mut inner, draft, &constants, name, intern))
    }

    /// Commits a group of standalone drafts, all or none.
    pub(crate) fn commit_batch(
        &self,
        drafts: Vec<NodeDraft>,
        intern: bool,
    ) -> Result<Vec<Arc<Node>>> {
        let mut inner = self.lock();
        for draft in &drafts {
            self.check_inputs(draft, 0)?;
        }
        Ok(drafts
            .into_iter()
            .map(|draft| self.insert(&mut inner, draft, &[], None, intern))
            .collect())
    }

    fn check_owner(&self, node: &Node) -> Result<()> {
        if node.graph_id() != self.id {
            return Err(GraphError::ForeignInput {
                expected: self.id.0,
                found: node.graph_id().0,
            });
        }
        Ok(())
    }

    fn check_inputs(&self, draft: &NodeDraft, staged: usize) -> Result<()> {
        for input in &draft.inputs {
            match input {
                DraftInput::Value(value) => self.check_owner(value.node())?,
                DraftInput::Staged(index) if *index < staged => {}
                DraftInput::Staged(index) => {
                    return Err(GraphError::unsupported_input(format!(
                        "{}: staged input {index} is not part of this commit",
                        draft.op
                    )))
                }
            }
        }
        Ok(())
    }

    fn insert(
        &self,
        inner: &mut GraphInner,
        draft: NodeDraft,
        staged: &[Arc<Node>],
        name: Option<String>,
        intern: bool,
    ) -> Arc<Node> {
        let internable = intern && name.is_none();
        if internable {
            if let Some(existing) = draft
                .payload
                .as_ref()
                .and_then(|literal| inner.constants.get(literal))
                .and_then(|id| inner.get(*id))
            {
                tracing::trace!(
                    graph = self.id.0,
                    node = existing.id().0,
                    "reused interned constant"
                );
                return Arc::clone(existing);
            }
        }

        let inputs = draft
            .inputs
            .into_iter()
            .filter_map(|input| match input {
                DraftInput::Value(value) => Some(value),
                DraftInput::Staged(index) => staged.get(index).and_then(|node| node.output(0)),
            })
            .collect();

        let id = inner.next_id();
        let node = Arc::new(Node {
            id,
            graph: self.id,
            opset: draft.opset,
            op: draft.op,
            inputs,
            outputs: draft.outputs,
            attrs: draft.attrs,
            payload: draft.payload,
            name: RwLock::new(name.clone()),
        });

        if let Some(name) = name {
            inner.names.insert(name, id);
        }
        if let Some(literal) = node.literal().filter(|_| internable) {
            inner.constants.insert(Arc::clone(literal), id);
        }
        if node.op() == "Parameter" {
            inner.parameters.push(id);
        }
        inner.nodes.push(Arc::clone(&node));

        tracing::debug!(
            graph = self.id.0,
            node = id.0,
            opset = node.opset(),
            op = node.op(),
            name = ?node.name(),
            "committed node"
        );
        node
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &self.node_count())
            .finish()
    }
}

/// Text dump, one node per line in commit order.
impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nodes, results) = {
            let inner = self.lock();
            (inner.nodes.clone(), inner.results.clone())
        };
        writeln!(f, "graph #{} ({} nodes)", self.id.0, nodes.len())?;
        for node in &nodes {
            let inputs = node
                .inputs()
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>();
            write!(
                f,
                "  {} = {}.{}({})",
                node.id(),
                node.opset(),
                node.op(),
                inputs.join(", ")
            )?;
            if !node.attributes().is_empty() {
                let attrs = node
                    .attributes()
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>();
                write!(f, " {{{}}}", attrs.join(", "))?;
            }
            let outputs = node
                .output_specs()
                .iter()
                .map(|spec| spec.to_string())
                .collect::<Vec<_>>();
            write!(f, " -> {}", outputs.join(", "))?;
            if let Some(name) = node.name() {
                write!(f, "  // {name}")?;
            }
            writeln!(f)?;
        }
        if !results.is_empty() {
            let results = results.iter().map(|v| v.to_string()).collect::<Vec<_>>();
            writeln!(f, "  return {}", results.join(", "))?;
        }
        Ok(())
    }
}
