//! Operators of `opset1`.

use crate::attr::Attributes;
use crate::builder::{parameter_attrs, GraphBuilder, NodeInput};
use crate::error::{GraphError, Result};
use crate::graph::Value;
use crate::literal::TensorLiteral;
use crate::registry::OPSET1;
use crate::types::{ElementType, Shape};

use super::single;

pub fn parameter(
    builder: &GraphBuilder,
    element_type: ElementType,
    shape: impl Into<Shape>,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = parameter_attrs(element_type, &shape.into())?;
    single(builder, OPSET1, "Parameter", Vec::new(), attrs, name)
}

/// Constant from literal data, optionally cast to `element_type`.
pub fn constant(
    builder: &GraphBuilder,
    literal: TensorLiteral,
    element_type: Option<ElementType>,
    name: Option<&str>,
) -> Result<Value> {
    builder.constant_in(OPSET1, literal, element_type, name)
}

macro_rules! unary_ops {
    ($($(#[$doc:meta])* $func:ident => $op:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $func(
                builder: &GraphBuilder,
                data: impl Into<NodeInput>,
                name: Option<&str>,
            ) -> Result<Value> {
                single(builder, OPSET1, $op, vec![data.into()], Attributes::new(), name)
            }
        )*
    };
}

unary_ops!(
    relu => "Relu",
    sigmoid => "Sigmoid",
    tanh => "Tanh",
    exp => "Exp",
    erf => "Erf",
    sqrt => "Sqrt",
    abs => "Abs",
    /// Elementwise negation; signed and floating-point inputs only.
    negative => "Negative",
);

pub fn elu(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    alpha: f64,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("alpha", alpha);
    single(builder, OPSET1, "Elu", vec![data.into()], attrs, name)
}

/// Clamps every element into `[min, max]`.
pub fn clamp(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    min: f64,
    max: f64,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("min", min).with("max", max);
    single(builder, OPSET1, "Clamp", vec![data.into()], attrs, name)
}

/// Binary arithmetic with an explicit `auto_broadcast` mode (`"numpy"` or `"none"`).
pub fn binary(
    builder: &GraphBuilder,
    op: &str,
    lhs: impl Into<NodeInput>,
    rhs: impl Into<NodeInput>,
    auto_broadcast: &str,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("auto_broadcast", auto_broadcast);
    single(builder, OPSET1, op, vec![lhs.into(), rhs.into()], attrs, name)
}

macro_rules! binary_ops {
    ($($func:ident => $op:literal),* $(,)?) => {
        $(
            /// Numpy-broadcasting elementwise operator.
            pub fn $func(
                builder: &GraphBuilder,
                lhs: impl Into<NodeInput>,
                rhs: impl Into<NodeInput>,
                name: Option<&str>,
            ) -> Result<Value> {
                single(
                    builder,
                    OPSET1,
                    $op,
                    vec![lhs.into(), rhs.into()],
                    Attributes::new(),
                    name,
                )
            }
        )*
    };
}

binary_ops!(
    add => "Add",
    subtract => "Subtract",
    multiply => "Multiply",
    divide => "Divide",
    maximum => "Maximum",
    minimum => "Minimum",
);

pub fn convert(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    destination_type: ElementType,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("destination_type", destination_type.name());
    single(builder, OPSET1, "Convert", vec![data.into()], attrs, name)
}

pub fn concat(
    builder: &GraphBuilder,
    inputs: Vec<NodeInput>,
    axis: i64,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("axis", axis);
    single(builder, OPSET1, "Concat", inputs, attrs, name)
}

/// Reshapes `data` to `shape`; `-1` infers one dimension and, with `special_zero`, `0` copies
/// the input dimension at the same position.
pub fn reshape(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    shape: impl Into<NodeInput>,
    special_zero: bool,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("special_zero", special_zero);
    single(builder, OPSET1, "Reshape", vec![data.into(), shape.into()], attrs, name)
}

pub fn transpose(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    perm: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<Value> {
    single(
        builder,
        OPSET1,
        "Transpose",
        vec![data.into(), perm.into()],
        Attributes::new(),
        name,
    )
}

pub fn matmul(
    builder: &GraphBuilder,
    a: impl Into<NodeInput>,
    b: impl Into<NodeInput>,
    transpose_a: bool,
    transpose_b: bool,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new()
        .with("transpose_a", transpose_a)
        .with("transpose_b", transpose_b);
    single(builder, OPSET1, "MatMul", vec![a.into(), b.into()], attrs, name)
}

pub fn softmax(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    axis: i64,
    name: Option<&str>,
) -> Result<Value> {
    let attrs = Attributes::new().with("axis", axis);
    single(builder, OPSET1, "Softmax", vec![data.into()], attrs, name)
}

/// Splits `data` into `num_splits` equal parts along `axis`.
pub fn split(
    builder: &GraphBuilder,
    data: impl Into<NodeInput>,
    axis: impl Into<NodeInput>,
    num_splits: usize,
    name: Option<&str>,
) -> Result<Vec<Value>> {
    let num_splits = i64::try_from(num_splits).map_err(|_| {
        GraphError::invalid_attribute_value(
            "Split",
            "num_splits",
            format!("{num_splits} does not fit i64"),
        )
    })?;
    let attrs = Attributes::new().with("num_splits", num_splits);
    let node = builder.create_op_in(
        OPSET1,
        "Split",
        vec![data.into(), axis.into()],
        attrs,
        name,
    )?;
    Ok(node.outputs())
}
