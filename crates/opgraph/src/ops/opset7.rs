//! Operators of `opset7`.

pub use super::opset1::*;

use crate::attr::Attributes;
use crate::builder::{GraphBuilder, NodeInput};
use crate::error::Result;
use crate::graph::Value;
use crate::registry::OPSET7;

use super::single;

/// Gaussian error linear unit.
///
/// `approximation_mode` is `"erf"` or `"tanh"`, matched exactly. The output has the same element
/// type and shape as `data`, which must be floating-point.
pub fn gelu(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    approximation_mode: &str,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("approximation_mode", approximation_mode);
    single(builder, OPSET7, "Gelu", vec![data.into()], attrs, name)
}
