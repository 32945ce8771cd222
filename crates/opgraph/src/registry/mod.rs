//! Operator registry: `(opset, op)` keyed schemas plus the generic validation pipeline.
//!
//! Every operator, built-in or user supplied, is a declarative [`OpSchema`]. A single
//! [`OpRegistry::create`] drives lookup, arity, input types, attributes and inference in that
//! order and yields a [`NodeDraft`] that a [`Graph`](crate::graph::Graph) can commit.
//!
//! Opsets are independent namespaces. Later built-in opsets copy the definitions of earlier
//! ones when the registry is constructed; lookups never fall back across opsets.

mod builtin;
pub mod defs;
mod schema;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::attr::Attributes;
use crate::error::{GraphError, Result};
use crate::graph::NodeDraft;
use crate::literal::TensorLiteral;

pub use builtin::{OPSET1, OPSET2, OPSET7};
pub use schema::{Arity, InferContext, InferFn, InputSpec, OpInput, OpSchema, TypeSet};

/// Name of the operator every literal constant is built with.
pub const CONSTANT_OP: &str = "Constant";

type Opset = BTreeMap<Arc<str>, Arc<OpSchema>>;

/// Immutable-after-construction table of operator schemas.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    opsets: BTreeMap<Arc<str>, Opset>,
}

static BUILTIN_REGISTRY: OnceLock<Arc<OpRegistry>> = OnceLock::new();

/// Process-wide registry holding the built-in opsets.
pub fn builtin_registry() -> Arc<OpRegistry> {
    Arc::clone(BUILTIN_REGISTRY.get_or_init(|| Arc::new(builtin::build())))
}

impl OpRegistry {
    /// Empty registry without any opsets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh copy of the built-in opsets, ready for extension.
    pub fn with_builtins() -> Self {
        builtin::build()
    }

    /// Registers `schema` as `op` in `opset`, creating the opset on first use.
    pub fn register(&mut self, opset: &str, op: &str, mut schema: OpSchema) -> Result<()> {
        if self.contains(opset, op) {
            return Err(GraphError::DuplicateOperator {
                opset: opset.to_string(),
                op: op.to_string(),
            });
        }
        schema.op = Arc::from(op);
        self.define(opset, schema);
        Ok(())
    }

    /// Copies every definition of `base` into `target` that `target` does not define itself.
    pub fn extend_opset(&mut self, target: &str, base: &str) -> Result<()> {
        let inherited = self
            .opsets
            .get(base)
            .cloned()
            .ok_or_else(|| GraphError::unknown_operator(base, "*"))?;
        let ops = self.opset_mut(target);
        for (name, schema) in inherited {
            ops.entry(name).or_insert(schema);
        }
        Ok(())
    }

    pub(crate) fn define(&mut self, opset: &str, schema: OpSchema) {
        let op = Arc::clone(&schema.op);
        self.opset_mut(opset).insert(op, Arc::new(schema));
    }

    fn opset_mut(&mut self, opset: &str) -> &mut Opset {
        self.opsets.entry(Arc::from(opset)).or_default()
    }

    pub fn contains(&self, opset: &str, op: &str) -> bool {
        self.schema(opset, op).is_some()
    }

    pub fn schema(&self, opset: &str, op: &str) -> Option<&Arc<OpSchema>> {
        self.opsets.get(opset)?.get(op)
    }

    /// Opset names in lexical order.
    pub fn opsets(&self) -> Vec<&str> {
        self.opsets.keys().map(|name| &**name).collect()
    }

    /// Operator names of `opset` in lexical order; empty for an unknown opset.
    pub fn operators(&self, opset: &str) -> Vec<&str> {
        self.opsets
            .get(opset)
            .map(|ops| ops.keys().map(|name| &**name).collect())
            .unwrap_or_default()
    }

    /// Validates a prospective node and infers its outputs.
    pub fn create(
        &self,
        opset: &str,
        op: &str,
        inputs: Vec<OpInput>,
        attrs: Attributes,
    ) -> Result<NodeDraft> {
        self.build(opset, op, inputs, attrs, None)
    }

    /// Builds a `Constant` draft carrying `literal`.
    pub fn create_constant(&self, opset: &str, literal: Arc<TensorLiteral>) -> Result<NodeDraft> {
        self.build(opset, CONSTANT_OP, Vec::new(), Attributes::new(), Some(literal))
    }

    fn build(
        &self,
        opset: &str,
        op: &str,
        inputs: Vec<OpInput>,
        attrs: Attributes,
        payload: Option<Arc<TensorLiteral>>,
    ) -> Result<NodeDraft> {
        let (opset_name, ops) = self
            .opsets
            .get_key_value(opset)
            .ok_or_else(|| GraphError::unknown_operator(opset, op))?;
        let schema = ops
            .get(op)
            .ok_or_else(|| GraphError::unknown_operator(opset, op))?;

        tracing::trace!(opset, op, inputs = inputs.len(), "validating operator");
        schema.check_arity(inputs.len())?;
        schema.check_input_types(&inputs)?;
        let attrs = schema.normalize_attrs(attrs)?;

        let outputs = {
            let ctx = InferContext {
                op: &schema.op,
                inputs: &inputs,
                attrs: &attrs,
                payload: payload.as_deref(),
            };
            (schema.infer)(&ctx)?
        };
        tracing::trace!(opset, op, outputs = outputs.len(), "inferred outputs");

        Ok(NodeDraft {
            opset: Arc::clone(opset_name),
            op: Arc::clone(&schema.op),
            inputs: inputs.into_iter().map(|input| input.source).collect(),
            outputs,
            attrs,
            payload,
        })
    }
}
