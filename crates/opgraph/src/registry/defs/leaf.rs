//! Leaf operators: graph inputs and literal constants.

use crate::attr::{AttrKind, AttrSpec, AttrValue};
use crate::error::Result;
use crate::registry::{InferContext, OpSchema};
use crate::types::{Dimension, ElementType, Shape, TensorSpec};

use super::element_type_name;

/// External input. `shape` uses `-1` for a dynamic dimension; omitting it leaves the rank dynamic.
pub fn parameter() -> OpSchema {
    OpSchema::new("Parameter", infer_parameter)
        .attr(AttrSpec::required("element_type", AttrKind::String).validate(element_type_name))
        .attr(AttrSpec::optional("shape", AttrKind::Ints).validate(shape_dims))
}

pub fn constant() -> OpSchema {
    OpSchema::new(crate::registry::CONSTANT_OP, infer_constant)
}

fn shape_dims(value: &AttrValue) -> std::result::Result<(), String> {
    let dims = value.as_ints().ok_or_else(|| "expected a list of ints".to_string())?;
    match dims.iter().find(|dim| **dim < -1) {
        Some(dim) => Err(format!("dimension {dim} is neither -1 nor a size")),
        None => Ok(()),
    }
}

fn infer_parameter(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let element_type = ElementType::from_name(ctx.attr_str("element_type")?)?;
    let shape = match ctx.attr("shape").and_then(AttrValue::as_ints) {
        None => Shape::dynamic(),
        Some(dims) => Shape::new(dims.iter().map(|dim| match usize::try_from(*dim) {
            Ok(size) => Dimension::Static(size),
            Err(_) => Dimension::Dynamic,
        })),
    };
    Ok(vec![TensorSpec::new(element_type, shape)])
}

fn infer_constant(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let literal = ctx
        .payload()
        .ok_or_else(|| ctx.fail("a constant needs a literal payload"))?;
    Ok(vec![literal.spec()])
}
