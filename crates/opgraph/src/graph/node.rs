//! Nodes and the values they produce.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::attr::{AttrValue, Attributes};
use crate::literal::TensorLiteral;
use crate::types::{ElementType, Shape, TensorSpec};

/// Identifier of a node inside its owning graph; dense and assigned in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Process-unique identifier of a [`Graph`](super::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub u64);

/// One operator invocation committed into a graph.
///
/// Everything except the name is fixed at commit time. Inputs are shared references to the
/// producing nodes, so a node keeps its producers alive.
pub struct Node {
    pub(super) id: NodeId,
    pub(super) graph: GraphId,
    pub(super) opset: Arc<str>,
    pub(super) op: Arc<str>,
    pub(super) inputs: Vec<Value>,
    pub(super) outputs: Vec<TensorSpec>,
    pub(super) attrs: Attributes,
    pub(super) payload: Option<Arc<TensorLiteral>>,
    pub(super) name: RwLock<Option<String>>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph_id(&self) -> GraphId {
        self.graph
    }

    pub fn opset(&self) -> &str {
        &self.opset
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    pub fn output_specs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Literal payload of a `Constant` node.
    pub fn literal(&self) -> Option<&Arc<TensorLiteral>> {
        self.payload.as_ref()
    }

    pub fn name(&self) -> Option<String> {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_constant(&self) -> bool {
        self.payload.is_some()
    }

    /// Handle to output `index`, or `None` when out of range.
    pub fn output(self: &Arc<Self>, index: usize) -> Option<Value> {
        (index < self.outputs.len()).then(|| Value {
            node: Arc::clone(self),
            index,
        })
    }

    /// Handles to every output, in order.
    pub fn outputs(self: &Arc<Self>) -> Vec<Value> {
        (0..self.outputs.len())
            .map(|index| Value {
                node: Arc::clone(self),
                index,
            })
            .collect()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("opset", &self.opset)
            .field("op", &self.op)
            .field("name", &self.name())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("attrs", &self.attrs)
            .finish()
    }
}

/// Where a draft input comes from before it is committed.
#[derive(Debug, Clone)]
pub enum DraftInput {
    /// An output already committed into the graph.
    Value(Value),
    /// Output 0 of the constant staged at this index in the same commit.
    Staged(usize),
}

/// A validated and inferred node that is not yet part of any graph.
///
/// Produced by [`OpRegistry::create`](crate::registry::OpRegistry::create) and turned into a
/// [`Node`] only by [`Graph`](super::Graph) commits.
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub(crate) opset: Arc<str>,
    pub(crate) op: Arc<str>,
    pub(crate) inputs: Vec<DraftInput>,
    pub(crate) outputs: Vec<TensorSpec>,
    pub(crate) attrs: Attributes,
    pub(crate) payload: Option<Arc<TensorLiteral>>,
}

impl NodeDraft {
    pub fn opset(&self) -> &str {
        &self.opset
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn inputs(&self) -> &[DraftInput] {
        &self.inputs
    }

    pub fn output_specs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    pub fn literal(&self) -> Option<&Arc<TensorLiteral>> {
        self.payload.as_ref()
    }
}

/// A typed output of a node: `(node, output index)`.
#[derive(Clone)]
pub struct Value {
    node: Arc<Node>,
    index: usize,
}

impl Value {
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &TensorSpec {
        &self.node.outputs[self.index]
    }

    pub fn element_type(&self) -> ElementType {
        self.spec().element_type
    }

    pub fn shape(&self) -> &Shape {
        &self.spec().shape
    }

    /// `true` when both handles name the same output of the same node.
    pub fn same_as(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.node, &other.node) && self.index == other.index
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.node.id, self.index, self.spec())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node.id, self.index)
    }
}
