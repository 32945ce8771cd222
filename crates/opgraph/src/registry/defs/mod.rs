//! Built-in operator definitions, grouped by family.
//!
//! Each function returns a ready-to-register [`OpSchema`](super::OpSchema); the opset tables in
//! `builtin.rs` decide which definition each opset gets.

pub mod activation;
pub mod elementwise;
pub mod leaf;
pub mod linalg;
pub mod shape_ops;

use crate::attr::AttrValue;
use crate::error::Result;
use crate::types::TensorSpec;

use super::InferContext;

/// Output spec equals the spec of input 0.
pub fn same_as_input(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    Ok(vec![ctx.input(0)?.clone()])
}

/// Reads an integer constant feeding input `index`; `None` when the input is not a constant.
pub(crate) fn int_literal(ctx: &InferContext<'_>, index: usize) -> Result<Option<Vec<i64>>> {
    ctx.literal(index)
        .map(|literal| {
            literal
                .to_i64_vec()
                .map_err(|err| ctx.fail(format!("input {index}: {err}")))
        })
        .transpose()
}

pub(crate) fn positive(value: &AttrValue) -> std::result::Result<(), String> {
    match value.as_int() {
        Some(v) if v > 0 => Ok(()),
        Some(v) => Err(format!("must be positive, got {v}")),
        None => Err("expected an int".to_string()),
    }
}

pub(crate) fn element_type_name(value: &AttrValue) -> std::result::Result<(), String> {
    let name = value.as_str().ok_or_else(|| "expected a string".to_string())?;
    crate::types::ElementType::from_name(name)
        .map(|_| ())
        .map_err(|err| err.to_string())
}
