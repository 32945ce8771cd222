//! One function per operator, grouped by opset.
//!
//! Every function forwards to [`GraphBuilder::create_op_in`] with a fixed opset and operator
//! name and builds the attribute map from its arguments. A later opset module re-exports the
//! functions it did not change from earlier ones.

pub mod opset1;
pub mod opset2;
pub mod opset7;

use crate::attr::Attributes;
use crate::builder::{first_output, GraphBuilder, NodeInput};
use crate::error::Result;
use crate::graph::Value;

/// Creates a single-output operator and returns its value.
pub(crate) fn single(
    builder: &GraphBuilder,
    opset: &str,
    op: &str,
    inputs: Vec<NodeInput>,
    attrs: Attributes,
    name: Option<&str>,
) -> Result<Value> {
    let node = builder.create_op_in(opset, op, inputs, attrs, name)?;
    first_output(&node)
}
