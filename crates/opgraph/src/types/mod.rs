//! Type system shared by every other component: element types, dimensions and shapes.

pub mod element;
pub mod shape;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use element::ElementType;
pub use shape::{normalize_axis, Dimension, Dims, Shape};

/// Element type and shape of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSpec {
    pub element_type: ElementType,
    pub shape: Shape,
}

impl TensorSpec {
    pub fn new(element_type: ElementType, shape: impl Into<Shape>) -> Self {
        Self {
            element_type,
            shape: shape.into(),
        }
    }

    /// Total byte length when the shape is static and the element type has a size.
    pub fn byte_len(&self) -> Option<usize> {
        let count = self.shape.element_count()?;
        if self.element_type == ElementType::U1 {
            return Some(count.div_ceil(8));
        }
        count.checked_mul(self.element_type.size_in_bytes())
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tensor<{} x {}>", self.element_type, self.shape)
    }
}
