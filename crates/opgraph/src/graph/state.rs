//! Mutable graph bookkeeping guarded by the [`Graph`](super::Graph) mutex.

use std::collections::HashMap;
use std::sync::Arc;

use crate::literal::TensorLiteral;

use super::node::{Node, NodeId, Value};

/// Everything a commit touches. Only ever accessed with the graph lock held.
pub(super) struct GraphInner {
    pub(super) nodes: Vec<Arc<Node>>,
    pub(super) names: HashMap<String, NodeId>,
    pub(super) constants: HashMap<Arc<TensorLiteral>, NodeId>,
    pub(super) parameters: Vec<NodeId>,
    pub(super) results: Vec<Value>,
}

impl GraphInner {
    pub(super) fn new() -> Self {
        GraphInner {
            nodes: Vec::new(),
            names: HashMap::new(),
            constants: HashMap::new(),
            parameters: Vec::new(),
            results: Vec::new(),
        }
    }

    pub(super) fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    pub(super) fn get(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(id.0 as usize)
    }

    pub(super) fn name_taken(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }
}
