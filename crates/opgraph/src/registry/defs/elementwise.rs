//! Elementwise unary and binary arithmetic plus element type conversion.

use crate::attr::{AttrKind, AttrSpec};
use crate::error::{GraphError, Result};
use crate::registry::{InferContext, OpSchema, TypeSet};
use crate::types::{ElementType, TensorSpec};

use super::{element_type_name, same_as_input};

pub const AUTO_BROADCAST_MODES: &[&str] = &["numpy", "none"];

/// Unary operator whose output spec equals its input spec.
pub fn unary(op: &str, types: TypeSet) -> OpSchema {
    OpSchema::new(op, same_as_input).input("data", types)
}

pub fn elu() -> OpSchema {
    unary("Elu", TypeSet::Float).attr(AttrSpec::required("alpha", AttrKind::Float))
}

pub fn clamp() -> OpSchema {
    OpSchema::new("Clamp", infer_clamp)
        .input("data", TypeSet::Numeric)
        .attr(AttrSpec::required("min", AttrKind::Float))
        .attr(AttrSpec::required("max", AttrKind::Float))
}

fn infer_clamp(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let (min, max) = (ctx.attr_float("min")?, ctx.attr_float("max")?);
    if min > max {
        return Err(GraphError::invalid_attribute_value(
            ctx.op(),
            "min",
            format!("min {min} exceeds max {max}"),
        ));
    }
    same_as_input(ctx)
}

/// Binary arithmetic with numpy or strict broadcasting.
pub fn binary(op: &str) -> OpSchema {
    OpSchema::new(op, infer_binary)
        .input("lhs", TypeSet::Numeric)
        .input("rhs", TypeSet::Numeric)
        .attr(AttrSpec::with_default("auto_broadcast", "numpy").choices(AUTO_BROADCAST_MODES))
}

fn infer_binary(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let (lhs, rhs) = (ctx.input(0)?, ctx.input(1)?);
    let element_type = lhs
        .element_type
        .merge(rhs.element_type)
        .ok_or_else(|| {
            ctx.fail(format!(
                "element types {} and {} do not match",
                lhs.element_type, rhs.element_type
            ))
        })?;
    let shape = match ctx.attr_str("auto_broadcast")? {
        "none" => lhs.shape.merge(&rhs.shape).ok_or_else(|| {
            ctx.fail(format!("shapes {} and {} differ", lhs.shape, rhs.shape))
        })?,
        _ => lhs.shape.broadcast(&rhs.shape).ok_or_else(|| {
            ctx.fail(format!(
                "shapes {} and {} do not broadcast",
                lhs.shape, rhs.shape
            ))
        })?,
    };
    Ok(vec![TensorSpec::new(element_type, shape)])
}

pub fn convert() -> OpSchema {
    OpSchema::new("Convert", infer_convert)
        .input("data", TypeSet::Any)
        .attr(AttrSpec::required("destination_type", AttrKind::String).validate(element_type_name))
}

fn infer_convert(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let element_type = ElementType::from_name(ctx.attr_str("destination_type")?)?;
    Ok(vec![TensorSpec::new(element_type, ctx.input(0)?.shape.clone())])
}
