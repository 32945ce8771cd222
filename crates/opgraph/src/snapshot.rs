//! Structural snapshot of a graph and rebuilding a graph from one.
//!
//! A snapshot lists nodes in commit order with their inputs as `(node, output)` references,
//! normalized attributes, output specs and constant payloads. Rebuilding replays every node
//! through a registry, so a snapshot produced by one registry only rebuilds against a registry
//! that defines the same operators.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attr::Attributes;
use crate::builder::{GraphBuilder, NodeInput};
use crate::config::BuilderConfig;
use crate::error::{GraphError, Result};
use crate::graph::{Graph, Node, NodeId, Value};
use crate::literal::TensorLiteral;
use crate::registry::OpRegistry;
use crate::types::TensorSpec;

/// Reference to one output of a node in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRef {
    pub node: NodeId,
    pub output: usize,
}

impl From<&Value> for ValueRef {
    fn from(value: &Value) -> Self {
        ValueRef {
            node: value.node().id(),
            output: value.index(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub opset: String,
    pub op: String,
    pub inputs: Vec<ValueRef>,
    #[serde(default)]
    pub attributes: Attributes,
    pub outputs: Vec<TensorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<TensorLiteral>,
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        NodeSnapshot {
            id: node.id(),
            name: node.name(),
            opset: node.opset().to_string(),
            op: node.op().to_string(),
            inputs: node.inputs().iter().map(ValueRef::from).collect(),
            attributes: node.attributes().clone(),
            outputs: node.output_specs().to_vec(),
            literal: node.literal().map(|literal| TensorLiteral::clone(literal)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub results: Vec<ValueRef>,
}

impl GraphSnapshot {
    pub fn capture(graph: &Graph) -> Self {
        GraphSnapshot {
            nodes: graph
                .nodes()
                .iter()
                .map(|node| NodeSnapshot::from(node.as_ref()))
                .collect(),
            results: graph.results().iter().map(ValueRef::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Replays the snapshot into a fresh graph.
    ///
    /// Every node goes through the registry again, and the re-inferred outputs must equal the
    /// recorded ones.
    pub fn rebuild(
        &self,
        registry: Arc<OpRegistry>,
        config: BuilderConfig,
    ) -> Result<GraphBuilder> {
        let builder = GraphBuilder::with_registry(registry, config);
        let mut rebuilt: HashMap<NodeId, Arc<Node>> = HashMap::with_capacity(self.nodes.len());
        for record in &self.nodes {
            let name = record.name.as_deref();
            let node = match &record.literal {
                Some(literal) => {
                    let value = builder.constant_in(&record.opset, literal.clone(), None, name)?;
                    Arc::clone(value.node())
                }
                None => {
                    let inputs = record
                        .inputs
                        .iter()
                        .map(|input| lookup(&rebuilt, *input).map(NodeInput::Value))
                        .collect::<Result<Vec<_>>>()?;
                    builder.create_op_in(
                        &record.opset,
                        &record.op,
                        inputs,
                        record.attributes.clone(),
                        name,
                    )?
                }
            };
            if node.output_specs() != record.outputs.as_slice() {
                return Err(GraphError::shape_inference(
                    record.op.as_str(),
                    format!(
                        "node {} rebuilt with outputs {:?}, snapshot records {:?}",
                        record.id,
                        node.output_specs(),
                        record.outputs
                    ),
                ));
            }
            rebuilt.insert(record.id, node);
        }
        for result in &self.results {
            builder.set_result(&lookup(&rebuilt, *result)?)?;
        }
        tracing::debug!(
            graph = builder.graph().id().0,
            nodes = self.nodes.len(),
            "rebuilt graph from snapshot"
        );
        Ok(builder)
    }
}

fn lookup(rebuilt: &HashMap<NodeId, Arc<Node>>, value: ValueRef) -> Result<Value> {
    let node = rebuilt.get(&value.node).ok_or_else(|| {
        GraphError::unsupported_input(format!("snapshot references unknown node {}", value.node))
    })?;
    node.output(value.output).ok_or_else(|| {
        GraphError::unsupported_input(format!(
            "node {} has no output {}",
            value.node, value.output
        ))
    })
}
