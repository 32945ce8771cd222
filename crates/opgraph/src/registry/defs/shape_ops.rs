//! Operators that rearrange data without computing on it.
//!
//! Reshape, Transpose and Split read their shape-like second input when it is a constant. When
//! it is not, inference keeps whatever rank information is still known and leaves the rest
//! dynamic.

use crate::attr::{AttrKind, AttrSpec};
use crate::error::Result;
use crate::registry::{InferContext, OpSchema, TypeSet};
use crate::types::{normalize_axis, Dimension, Dims, ElementType, Shape, TensorSpec};

use super::{int_literal, positive};

/// Upper bound on `num_splits`, checked before any output is allocated.
pub const MAX_SPLITS: usize = 1 << 16;

pub fn concat() -> OpSchema {
    OpSchema::new("Concat", infer_concat)
        .variadic("inputs", TypeSet::Any, 1)
        .attr(AttrSpec::required("axis", AttrKind::Int))
}

fn infer_concat(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let axis = ctx.attr_int("axis")?;
    let mut element_type = ElementType::Dynamic;
    for (index, spec) in ctx.inputs().enumerate() {
        element_type = element_type.merge(spec.element_type).ok_or_else(|| {
            ctx.fail(format!(
                "input {index} has element type {}, expected {element_type}",
                spec.element_type
            ))
        })?;
    }

    let Some(rank) = ctx.inputs().find_map(|spec| spec.shape.rank()) else {
        return Ok(vec![TensorSpec::new(element_type, Shape::dynamic())]);
    };
    let axis = normalize_axis(axis, rank)
        .ok_or_else(|| ctx.fail(format!("axis {axis} is out of range for rank {rank}")))?;

    let mut dims: Dims = std::iter::repeat(Dimension::Dynamic).take(rank).collect();
    dims[axis] = Dimension::Static(0);
    for (index, spec) in ctx.inputs().enumerate() {
        let Some(input) = spec.shape.dims() else {
            dims[axis] = Dimension::Dynamic;
            continue;
        };
        if input.len() != rank {
            return Err(ctx.fail(format!(
                "input {index} has rank {}, expected {rank}",
                input.len()
            )));
        }
        for (i, dim) in input.iter().enumerate() {
            if i == axis {
                dims[i] = dims[i]
                    .add(*dim)
                    .ok_or_else(|| ctx.fail(format!("axis {i} dimension overflows")))?;
            } else {
                dims[i] = dims[i].merge(*dim).ok_or_else(|| {
                    ctx.fail(format!(
                        "input {index} has dimension {dim} at axis {i}, expected {}",
                        dims[i]
                    ))
                })?;
            }
        }
    }
    Ok(vec![TensorSpec::new(element_type, Shape::new(dims))])
}

pub fn reshape() -> OpSchema {
    OpSchema::new("Reshape", infer_reshape)
        .input("data", TypeSet::Any)
        .input("shape", TypeSet::Integer)
        .attr(AttrSpec::required("special_zero", AttrKind::Bool))
}

fn infer_reshape(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let data = ctx.input(0)?;
    let pattern = ctx.input(1)?;
    if pattern.shape.rank().is_some_and(|rank| rank != 1) {
        return Err(ctx.fail(format!(
            "target shape must be 1-D, got {}",
            pattern.shape
        )));
    }
    let Some(target) = int_literal(ctx, 1)? else {
        let shape = match pattern.shape.dims() {
            Some([Dimension::Static(len)]) => Shape::dynamic_of_rank(*len),
            _ => Shape::dynamic(),
        };
        return Ok(vec![TensorSpec::new(data.element_type, shape)]);
    };

    let special_zero = ctx.attr_bool("special_zero")?;
    let input_dims = data.shape.dims();
    let mut inferred = None;
    let mut dims = Dims::with_capacity(target.len());
    for (i, value) in target.iter().copied().enumerate() {
        let dim = match value {
            -1 => {
                if inferred.replace(i).is_some() {
                    return Err(ctx.fail("more than one dimension is -1"));
                }
                Dimension::Dynamic
            }
            0 if special_zero => match input_dims {
                Some(input) => *input.get(i).ok_or_else(|| {
                    ctx.fail(format!(
                        "dimension {i} copies from input rank {}",
                        input.len()
                    ))
                })?,
                None => Dimension::Dynamic,
            },
            v if v < 0 => return Err(ctx.fail(format!("invalid target dimension {v}"))),
            v => Dimension::Static(v as usize),
        };
        dims.push(dim);
    }

    let total = data.shape.element_count();
    let known = dims
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != inferred)
        .try_fold(1usize, |acc, (_, dim)| dim.get().and_then(|d| acc.checked_mul(d)));
    match (inferred, total, known) {
        (Some(slot), Some(total), Some(known)) => {
            if known == 0 || total % known != 0 {
                return Err(ctx.fail(format!(
                    "cannot reshape {} elements into {:?}",
                    total, target
                )));
            }
            dims[slot] = Dimension::Static(total / known);
        }
        (None, Some(total), Some(known)) if total != known => {
            return Err(ctx.fail(format!(
                "cannot reshape {} elements into {} elements",
                total, known
            )));
        }
        _ => {}
    }
    Ok(vec![TensorSpec::new(data.element_type, Shape::new(dims))])
}

pub fn transpose() -> OpSchema {
    OpSchema::new("Transpose", infer_transpose)
        .input("data", TypeSet::Any)
        .input("perm", TypeSet::Integer)
}

fn infer_transpose(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let data = ctx.input(0)?;
    let rank = data.shape.rank();
    let Some(perm) = int_literal(ctx, 1)? else {
        let shape = rank.map_or_else(Shape::dynamic, Shape::dynamic_of_rank);
        return Ok(vec![TensorSpec::new(data.element_type, shape)]);
    };
    let Some(input) = data.shape.dims() else {
        let shape = if perm.is_empty() {
            Shape::dynamic()
        } else {
            Shape::dynamic_of_rank(perm.len())
        };
        return Ok(vec![TensorSpec::new(data.element_type, shape)]);
    };

    if perm.is_empty() {
        let reversed = input.iter().rev().copied();
        return Ok(vec![TensorSpec::new(data.element_type, Shape::new(reversed))]);
    }
    let mut seen = vec![false; input.len()];
    let mut dims = Dims::with_capacity(input.len());
    for axis in &perm {
        let slot = usize::try_from(*axis)
            .ok()
            .filter(|a| *a < input.len() && !seen[*a])
            .ok_or_else(|| {
                ctx.fail(format!(
                    "{perm:?} is not a permutation of rank {}",
                    input.len()
                ))
            })?;
        seen[slot] = true;
        dims.push(input[slot]);
    }
    if perm.len() != input.len() {
        return Err(ctx.fail(format!(
            "{perm:?} is not a permutation of rank {}",
            input.len()
        )));
    }
    Ok(vec![TensorSpec::new(data.element_type, Shape::new(dims))])
}

pub fn split() -> OpSchema {
    OpSchema::new("Split", infer_split)
        .input("data", TypeSet::Any)
        .input("axis", TypeSet::Integer)
        .attr(AttrSpec::required("num_splits", AttrKind::Int).validate(positive))
}

fn infer_split(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let data = ctx.input(0)?;
    let count = usize::try_from(ctx.attr_int("num_splits")?)
        .map_err(|_| ctx.fail("num_splits does not fit usize"))?;
    if count > MAX_SPLITS {
        return Err(ctx.fail(format!(
            "num_splits {count} exceeds the limit of {MAX_SPLITS}"
        )));
    }
    let axis = match int_literal(ctx, 1)? {
        None => None,
        Some(values) if values.len() == 1 => Some(values[0]),
        Some(values) => {
            return Err(ctx.fail(format!(
                "axis must be a scalar, got {} values",
                values.len()
            )))
        }
    };

    let shape = match (data.shape.dims(), axis) {
        (None, _) => Shape::dynamic(),
        (Some(input), None) => Shape::dynamic_of_rank(input.len()),
        (Some(input), Some(axis)) => {
            let slot = normalize_axis(axis, input.len()).ok_or_else(|| {
                ctx.fail(format!(
                    "axis {axis} is out of range for rank {}",
                    input.len()
                ))
            })?;
            let mut dims = Dims::from_slice(input);
            if let Dimension::Static(extent) = input[slot] {
                if extent % count != 0 {
                    return Err(ctx.fail(format!(
                        "dimension {extent} at axis {slot} is not divisible into {count} splits"
                    )));
                }
                dims[slot] = Dimension::Static(extent / count);
            }
            Shape::new(dims)
        }
    };
    Ok(vec![TensorSpec::new(data.element_type, shape); count])
}
