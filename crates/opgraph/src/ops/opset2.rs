//! Operators of `opset2`: `opset1` plus the first Gelu definition.

pub use super::opset1::*;

use crate::attr::Attributes;
use crate::builder::{GraphBuilder, NodeInput};
use crate::error::Result;
use crate::graph::Value;
use crate::registry::OPSET2;

use super::single;

/// Gaussian error linear unit without a selectable approximation.
pub fn gelu(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<Value> {
    single(builder, OPSET2, "Gelu", vec![data.into()], Attributes::new(), name)
}
