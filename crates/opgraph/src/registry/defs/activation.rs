//! Activation operators with non-trivial attributes.

use crate::attr::{AttrKind, AttrSpec};
use crate::error::Result;
use crate::registry::{InferContext, OpSchema, TypeSet};
use crate::types::{normalize_axis, TensorSpec};

use super::same_as_input;

/// Accepted values of Gelu's `approximation_mode`; matching is exact and case-sensitive.
pub const GELU_APPROXIMATION_MODES: &[&str] = &["erf", "tanh"];

/// Gelu as first introduced: no attributes.
pub fn gelu_v2() -> OpSchema {
    OpSchema::new("Gelu", same_as_input).input("data", TypeSet::Float)
}

/// Gelu with an explicit approximation mode.
pub fn gelu_v7() -> OpSchema {
    OpSchema::new("Gelu", same_as_input)
        .input("data", TypeSet::Float)
        .attr(
            AttrSpec::required("approximation_mode", AttrKind::String)
                .choices(GELU_APPROXIMATION_MODES),
        )
}

pub fn softmax() -> OpSchema {
    OpSchema::new("Softmax", infer_softmax)
        .input("data", TypeSet::Float)
        .attr(AttrSpec::required("axis", AttrKind::Int))
}

fn infer_softmax(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let data = ctx.input(0)?;
    let axis = ctx.attr_int("axis")?;
    if axis < 0 {
        return Err(ctx.fail(format!("axis {axis} must be non-negative")));
    }
    if let Some(rank) = data.shape.rank() {
        normalize_axis(axis, rank)
            .ok_or_else(|| ctx.fail(format!("axis {axis} is out of range for rank {rank}")))?;
    }
    same_as_input(ctx)
}
