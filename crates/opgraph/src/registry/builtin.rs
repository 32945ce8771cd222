//! Built-in opset tables.

use super::defs::{activation, elementwise, leaf, linalg, shape_ops};
use super::{OpRegistry, TypeSet};

pub const OPSET1: &str = "opset1";
pub const OPSET2: &str = "opset2";
pub const OPSET7: &str = "opset7";

const FLOAT_UNARY: &[&str] = &["Relu", "Sigmoid", "Tanh", "Exp", "Erf", "Sqrt"];
const BINARY: &[&str] = &["Add", "Subtract", "Multiply", "Divide", "Maximum", "Minimum"];

pub(super) fn build() -> OpRegistry {
    let mut registry = OpRegistry::new();

    registry.define(OPSET1, leaf::parameter());
    registry.define(OPSET1, leaf::constant());
    for op in FLOAT_UNARY {
        registry.define(OPSET1, elementwise::unary(op, TypeSet::Float));
    }
    registry.define(OPSET1, elementwise::unary("Abs", TypeSet::Numeric));
    registry.define(OPSET1, elementwise::unary("Negative", TypeSet::Signed));
    registry.define(OPSET1, elementwise::elu());
    registry.define(OPSET1, elementwise::clamp());
    for op in BINARY {
        registry.define(OPSET1, elementwise::binary(op));
    }
    registry.define(OPSET1, elementwise::convert());
    registry.define(OPSET1, shape_ops::concat());
    registry.define(OPSET1, shape_ops::reshape());
    registry.define(OPSET1, shape_ops::transpose());
    registry.define(OPSET1, shape_ops::split());
    registry.define(OPSET1, linalg::matmul());
    registry.define(OPSET1, activation::softmax());

    registry.define(OPSET2, activation::gelu_v2());
    copy_forward(&mut registry, OPSET2, OPSET1);

    registry.define(OPSET7, activation::gelu_v7());
    copy_forward(&mut registry, OPSET7, OPSET2);

    tracing::debug!(opsets = ?registry.opsets(), "built-in operator registry ready");
    registry
}

fn copy_forward(registry: &mut OpRegistry, target: &str, base: &str) {
    if let Err(err) = registry.extend_opset(target, base) {
        tracing::warn!(opset = target, base, error = %err, "opset copy-forward skipped");
    }
}
