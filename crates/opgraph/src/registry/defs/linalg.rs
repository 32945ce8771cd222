use crate::attr::AttrSpec;
use crate::error::Result;
use crate::registry::{InferContext, OpSchema, TypeSet};
use crate::types::{Dimension, Dims, Shape, TensorSpec};

/// Matrix product with numpy semantics: 1-D operands are promoted and batch dims broadcast.
pub fn matmul() -> OpSchema {
    OpSchema::new("MatMul", infer_matmul)
        .input("a", TypeSet::Numeric)
        .input("b", TypeSet::Numeric)
        .attr(AttrSpec::with_default("transpose_a", false))
        .attr(AttrSpec::with_default("transpose_b", false))
}

fn infer_matmul(ctx: &InferContext<'_>) -> Result<Vec<TensorSpec>> {
    let (a, b) = (ctx.input(0)?, ctx.input(1)?);
    let element_type = a.element_type.merge(b.element_type).ok_or_else(|| {
        ctx.fail(format!(
            "element types {} and {} do not match",
            a.element_type, b.element_type
        ))
    })?;

    let (Some(a_dims), Some(b_dims)) = (a.shape.dims(), b.shape.dims()) else {
        return Ok(vec![TensorSpec::new(element_type, Shape::dynamic())]);
    };
    if a_dims.is_empty() || b_dims.is_empty() {
        return Err(ctx.fail("operands must have rank at least 1"));
    }

    let a_vector = a_dims.len() == 1;
    let b_vector = b_dims.len() == 1;
    let mut a_dims = Dims::from_slice(a_dims);
    let mut b_dims = Dims::from_slice(b_dims);
    if ctx.attr_bool("transpose_a")? && !a_vector {
        swap_last_two(&mut a_dims);
    }
    if ctx.attr_bool("transpose_b")? && !b_vector {
        swap_last_two(&mut b_dims);
    }
    if a_vector {
        a_dims.insert(0, Dimension::Static(1));
    }
    if b_vector {
        b_dims.push(Dimension::Static(1));
    }

    let (a_batch, a_mat) = a_dims.split_at(a_dims.len() - 2);
    let (b_batch, b_mat) = b_dims.split_at(b_dims.len() - 2);
    if !a_mat[1].compatible(b_mat[0]) {
        return Err(ctx.fail(format!(
            "contracting dimensions {} and {} differ",
            a_mat[1], b_mat[0]
        )));
    }

    let batch = Shape::new(a_batch.iter().copied())
        .broadcast(&Shape::new(b_batch.iter().copied()))
        .ok_or_else(|| {
            ctx.fail(format!(
                "batch dimensions of {} and {} do not broadcast",
                a.shape, b.shape
            ))
        })?;

    let mut out = Dims::from_slice(batch.dims().unwrap_or_default());
    if !a_vector {
        out.push(a_mat[0]);
    }
    if !b_vector {
        out.push(b_mat[1]);
    }
    Ok(vec![TensorSpec::new(element_type, Shape::new(out))])
}

fn swap_last_two(dims: &mut Dims) {
    let len = dims.len();
    dims.swap(len - 2, len - 1);
}
