//! Graph builder façade: normalizes raw inputs, validates through the registry and commits.
//!
//! Construction is a two-step pipeline. Inputs are first normalized into [`OpInput`]s, which
//! stages a `Constant` draft for every literal without touching the graph. The registry then
//! validates the operator and infers its outputs, and the graph commits the staged constants
//! and the new node under one lock. Any error along the way leaves the graph as it was.

use std::sync::Arc;

use half::{bf16, f16};

use crate::attr::Attributes;
use crate::config::BuilderConfig;
use crate::error::{GraphError, Result};
use crate::graph::{DraftInput, Graph, Node, NodeDraft, Value};
use crate::literal::TensorLiteral;
use crate::registry::{builtin_registry, OpInput, OpRegistry};
use crate::types::{Dimension, ElementType, Shape};

/// Anything that can feed an operator input.
#[derive(Debug, Clone)]
pub enum NodeInput {
    /// An existing output; passed through unchanged.
    Value(Value),
    /// A node with exactly one output.
    Node(Arc<Node>),
    /// Literal data, optionally cast to `element_type` before it becomes a constant.
    Literal {
        literal: TensorLiteral,
        element_type: Option<ElementType>,
    },
    /// JSON number, boolean or rectangular array of them.
    Json {
        value: serde_json::Value,
        element_type: Option<ElementType>,
    },
}

impl NodeInput {
    pub fn json(value: serde_json::Value) -> Self {
        NodeInput::Json {
            value,
            element_type: None,
        }
    }

    /// Requests a specific element type for literal inputs; other inputs are unaffected.
    pub fn with_element_type(self, element_type: ElementType) -> Self {
        match self {
            NodeInput::Literal { literal, .. } => NodeInput::Literal {
                literal,
                element_type: Some(element_type),
            },
            NodeInput::Json { value, .. } => NodeInput::Json {
                value,
                element_type: Some(element_type),
            },
            other => other,
        }
    }
}

impl From<Value> for NodeInput {
    fn from(value: Value) -> Self {
        NodeInput::Value(value)
    }
}

impl From<&Value> for NodeInput {
    fn from(value: &Value) -> Self {
        NodeInput::Value(value.clone())
    }
}

impl From<Arc<Node>> for NodeInput {
    fn from(node: Arc<Node>) -> Self {
        NodeInput::Node(node)
    }
}

impl From<&Arc<Node>> for NodeInput {
    fn from(node: &Arc<Node>) -> Self {
        NodeInput::Node(Arc::clone(node))
    }
}

impl From<TensorLiteral> for NodeInput {
    fn from(literal: TensorLiteral) -> Self {
        NodeInput::Literal {
            literal,
            element_type: None,
        }
    }
}

impl From<serde_json::Value> for NodeInput {
    fn from(value: serde_json::Value) -> Self {
        NodeInput::json(value)
    }
}

macro_rules! native_input {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for NodeInput {
                fn from(value: $ty) -> Self {
                    NodeInput::from(TensorLiteral::scalar(value))
                }
            }

            impl From<Vec<$ty>> for NodeInput {
                fn from(values: Vec<$ty>) -> Self {
                    NodeInput::from(TensorLiteral::from_slice(&values))
                }
            }

            impl From<&[$ty]> for NodeInput {
                fn from(values: &[$ty]) -> Self {
                    NodeInput::from(TensorLiteral::from_slice(values))
                }
            }
        )*
    };
}

native_input!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, f16, bf16);

/// Entry point for building one graph against one registry.
///
/// Cloning is cheap; clones share the graph and registry.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    graph: Arc<Graph>,
    registry: Arc<OpRegistry>,
    config: BuilderConfig,
}

impl GraphBuilder {
    /// New graph over the built-in registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self::with_registry(builtin_registry(), config)
    }

    pub fn with_registry(registry: Arc<OpRegistry>, config: BuilderConfig) -> Self {
        Self::from_parts(Arc::new(Graph::new()), registry, config)
    }

    /// Builder over an existing graph.
    pub fn from_parts(graph: Arc<Graph>, registry: Arc<OpRegistry>, config: BuilderConfig) -> Self {
        GraphBuilder {
            graph,
            registry,
            config,
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<OpRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Normalizes one input into a value of this graph, creating a constant for literals.
    pub fn as_node(&self, input: impl Into<NodeInput>) -> Result<Value> {
        let mut values = self.as_nodes([input])?;
        values
            .pop()
            .ok_or_else(|| GraphError::unsupported_input("no value produced"))
    }

    /// Normalizes several inputs in order; the new constants are committed all together or not
    /// at all.
    pub fn as_nodes<I>(&self, inputs: I) -> Result<Vec<Value>>
    where
        I: IntoIterator,
        I::Item: Into<NodeInput>,
    {
        let opset = self.config.default_opset.as_str();
        let mut staged = Vec::new();
        let normalized = inputs
            .into_iter()
            .map(|input| self.normalize(opset, input.into(), &mut staged))
            .collect::<Result<Vec<_>>>()?;
        let committed = if staged.is_empty() {
            Vec::new()
        } else {
            self.graph.commit_batch(staged, self.config.intern_constants)?
        };
        normalized
            .into_iter()
            .map(|input| resolve(input.source, &committed))
            .collect()
    }

    /// Creates `op` from the default opset.
    pub fn create_op(
        &self,
        op: &str,
        inputs: Vec<NodeInput>,
        attrs: Attributes,
        name: Option<&str>,
    ) -> Result<Arc<Node>> {
        let opset = self.config.default_opset.clone();
        self.create_op_in(&opset, op, inputs, attrs, name)
    }

    /// Normalizes `inputs`, validates `op` and commits the node together with any constants
    /// its literal inputs needed.
    pub fn create_op_in(
        &self,
        opset: &str,
        op: &str,
        inputs: Vec<NodeInput>,
        attrs: Attributes,
        name: Option<&str>,
    ) -> Result<Arc<Node>> {
        let mut staged = Vec::new();
        let inputs = inputs
            .into_iter()
            .map(|input| self.normalize(opset, input, &mut staged))
            .collect::<Result<Vec<_>>>()?;
        let draft = self.registry.create(opset, op, inputs, attrs)?;
        self.commit(staged, draft, name)
    }

    /// Declares a graph input. Dynamic dimensions and dynamic rank are preserved.
    pub fn parameter(
        &self,
        element_type: ElementType,
        shape: impl Into<Shape>,
        name: Option<&str>,
    ) -> Result<Value> {
        let attrs = parameter_attrs(element_type, &shape.into())?;
        let node = self.create_op("Parameter", Vec::new(), attrs, name)?;
        first_output(&node)
    }

    /// Adds `literal` as a constant, cast to `element_type` when given.
    pub fn constant(
        &self,
        literal: TensorLiteral,
        element_type: Option<ElementType>,
        name: Option<&str>,
    ) -> Result<Value> {
        let opset = self.config.default_opset.clone();
        self.constant_in(&opset, literal, element_type, name)
    }

    pub fn constant_in(
        &self,
        opset: &str,
        literal: TensorLiteral,
        element_type: Option<ElementType>,
        name: Option<&str>,
    ) -> Result<Value> {
        let literal = match element_type {
            Some(target) => literal.cast(target)?,
            None => literal,
        };
        let draft = self.registry.create_constant(opset, Arc::new(literal))?;
        let node = self.commit(Vec::new(), draft, name)?;
        first_output(&node)
    }

    /// Marks `value` as a graph output.
    pub fn set_result(&self, value: &Value) -> Result<()> {
        self.graph.add_result(value)
    }

    pub fn set_name(&self, node: &Arc<Node>, name: impl Into<String>) -> Result<()> {
        self.graph.set_name(node, name)
    }

    fn commit(
        &self,
        staged: Vec<NodeDraft>,
        draft: NodeDraft,
        name: Option<&str>,
    ) -> Result<Arc<Node>> {
        self.graph.commit(
            staged,
            draft,
            name.map(str::to_string),
            self.config.intern_constants,
        )
    }

    fn normalize(
        &self,
        opset: &str,
        input: NodeInput,
        staged: &mut Vec<NodeDraft>,
    ) -> Result<OpInput> {
        match input {
            NodeInput::Value(value) => {
                self.check_owner(value.node())?;
                Ok(OpInput::from_value(&value))
            }
            NodeInput::Node(node) => {
                self.check_owner(&node)?;
                if node.output_count() != 1 {
                    return Err(GraphError::unsupported_input(format!(
                        "{} node {} has {} outputs; select one with Node::output",
                        node.op(),
                        node.id(),
                        node.output_count()
                    )));
                }
                let value = first_output(&node)?;
                Ok(OpInput::from_value(&value))
            }
            NodeInput::Literal {
                literal,
                element_type,
            } => self.stage_literal(opset, literal, element_type, staged),
            NodeInput::Json {
                value,
                element_type,
            } => {
                let literal = TensorLiteral::from_json(&value)?;
                self.stage_literal(opset, literal, element_type, staged)
            }
        }
    }

    fn stage_literal(
        &self,
        opset: &str,
        literal: TensorLiteral,
        element_type: Option<ElementType>,
        staged: &mut Vec<NodeDraft>,
    ) -> Result<OpInput> {
        let literal = match element_type {
            Some(target) => literal.cast(target)?,
            None => literal,
        };
        let literal = Arc::new(literal);
        let draft = self.registry.create_constant(opset, Arc::clone(&literal))?;
        tracing::trace!(
            graph = self.graph.id().0,
            element_type = %literal.element_type(),
            dims = ?literal.dims(),
            "staged literal constant"
        );
        staged.push(draft);
        Ok(OpInput {
            source: DraftInput::Staged(staged.len() - 1),
            spec: literal.spec(),
            literal: Some(literal),
        })
    }

    fn check_owner(&self, node: &Node) -> Result<()> {
        if node.graph_id() != self.graph.id() {
            return Err(GraphError::ForeignInput {
                expected: self.graph.id().0,
                found: node.graph_id().0,
            });
        }
        Ok(())
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(source: DraftInput, committed: &[Arc<Node>]) -> Result<Value> {
    match source {
        DraftInput::Value(value) => Ok(value),
        DraftInput::Staged(index) => committed
            .get(index)
            .ok_or_else(|| {
                GraphError::unsupported_input(format!("staged input {index} was not committed"))
            })
            .and_then(first_output),
    }
}

pub(crate) fn first_output(node: &Arc<Node>) -> Result<Value> {
    node.output(0).ok_or_else(|| {
        GraphError::unsupported_input(format!("{} node {} has no outputs", node.op(), node.id()))
    })
}

/// Attribute map of a `Parameter` with the given element type and shape.
pub(crate) fn parameter_attrs(element_type: ElementType, shape: &Shape) -> Result<Attributes> {
    let mut attrs = Attributes::new().with("element_type", element_type.name());
    if let Some(dims) = shape.dims() {
        let dims = dims
            .iter()
            .map(|dim| match dim {
                Dimension::Static(size) => i64::try_from(*size).map_err(|_| {
                    GraphError::invalid_attribute_value(
                        "Parameter",
                        "shape",
                        format!("dimension {size} does not fit i64"),
                    )
                }),
                Dimension::Dynamic => Ok(-1),
            })
            .collect::<Result<Vec<i64>>>()?;
        attrs.insert("shape", dims);
    }
    Ok(attrs)
}
