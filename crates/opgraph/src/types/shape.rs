//! Partial shapes: static or dynamic dimensions, with an optionally unknown rank.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline storage for the common low-rank case.
pub type Dims = SmallVec<[Dimension; 4]>;

/// A single axis extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Static(usize),
    Dynamic,
}

impl Dimension {
    pub fn is_static(self) -> bool {
        matches!(self, Dimension::Static(_))
    }

    pub fn is_dynamic(self) -> bool {
        matches!(self, Dimension::Dynamic)
    }

    /// Static extent, or `None` when dynamic.
    pub fn get(self) -> Option<usize> {
        match self {
            Dimension::Static(value) => Some(value),
            Dimension::Dynamic => None,
        }
    }

    pub fn compatible(self, other: Dimension) -> bool {
        match (self, other) {
            (Dimension::Static(a), Dimension::Static(b)) => a == b,
            _ => true,
        }
    }

    /// Refines two dimensions into one; `None` when both are static and differ.
    pub fn merge(self, other: Dimension) -> Option<Dimension> {
        match (self, other) {
            (Dimension::Static(a), Dimension::Static(b)) if a != b => None,
            (Dimension::Static(a), _) | (_, Dimension::Static(a)) => Some(Dimension::Static(a)),
            _ => Some(Dimension::Dynamic),
        }
    }

    /// Numpy broadcast of two extents.
    pub fn broadcast(self, other: Dimension) -> Option<Dimension> {
        match (self, other) {
            (Dimension::Static(1), d) | (d, Dimension::Static(1)) => Some(d),
            (Dimension::Static(a), Dimension::Static(b)) => {
                (a == b).then_some(Dimension::Static(a))
            }
            (Dimension::Static(a), Dimension::Dynamic)
            | (Dimension::Dynamic, Dimension::Static(a)) => Some(Dimension::Static(a)),
            (Dimension::Dynamic, Dimension::Dynamic) => Some(Dimension::Dynamic),
        }
    }

    /// Sum of two extents, dynamic if either side is; `None` when the sum overflows.
    pub fn add(self, other: Dimension) -> Option<Dimension> {
        match (self, other) {
            (Dimension::Static(a), Dimension::Static(b)) => a.checked_add(b).map(Dimension::Static),
            _ => Some(Dimension::Dynamic),
        }
    }
}

impl From<usize> for Dimension {
    fn from(value: usize) -> Self {
        Dimension::Static(value)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Static(value) => write!(f, "{value}"),
            Dimension::Dynamic => f.write_str("?"),
        }
    }
}

/// Tensor shape whose rank may itself be unknown.
///
/// `dims == None` means the rank is dynamic. `Some([])` is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Option<Dims>,
}

impl Shape {
    pub fn new(dims: impl IntoIterator<Item = Dimension>) -> Self {
        Self {
            dims: Some(dims.into_iter().collect()),
        }
    }

    /// Fully static shape.
    pub fn from_static(dims: &[usize]) -> Self {
        Self::new(dims.iter().copied().map(Dimension::Static))
    }

    /// Shape with unknown rank.
    pub fn dynamic() -> Self {
        Self { dims: None }
    }

    /// Shape with known rank and all dimensions dynamic.
    pub fn dynamic_of_rank(rank: usize) -> Self {
        Self::new(std::iter::repeat(Dimension::Dynamic).take(rank))
    }

    pub fn scalar() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(|dims| dims.len())
    }

    pub fn dims(&self) -> Option<&[Dimension]> {
        self.dims.as_deref()
    }

    pub fn is_rank_dynamic(&self) -> bool {
        self.dims.is_none()
    }

    /// `true` when the rank and every dimension are known.
    pub fn is_static(&self) -> bool {
        self.dims
            .as_ref()
            .is_some_and(|dims| dims.iter().all(|dim| dim.is_static()))
    }

    /// Returns static dimensions when the whole shape is static.
    pub fn to_static(&self) -> Option<Vec<usize>> {
        self.dims.as_ref()?.iter().map(|dim| dim.get()).collect()
    }

    /// Returns element count when all dims are static, `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        let mut count = 1usize;
        for dim in self.to_static()? {
            count = count.checked_mul(dim)?;
        }
        Some(count)
    }

    pub fn compatible(&self, other: &Shape) -> bool {
        match (&self.dims, &other.dims) {
            (Some(a), Some(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.compatible(*y))
            }
            _ => true,
        }
    }

    /// Refines two shapes into the most specific shape compatible with both.
    pub fn merge(&self, other: &Shape) -> Option<Shape> {
        match (&self.dims, &other.dims) {
            (None, _) => Some(other.clone()),
            (_, None) => Some(self.clone()),
            (Some(a), Some(b)) => {
                if a.len() != b.len() {
                    return None;
                }
                let dims = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| x.merge(*y))
                    .collect::<Option<Dims>>()?;
                Some(Shape { dims: Some(dims) })
            }
        }
    }

    /// Numpy-style broadcast, right-aligned. `None` when the shapes cannot broadcast.
    pub fn broadcast(&self, other: &Shape) -> Option<Shape> {
        let (a, b) = match (&self.dims, &other.dims) {
            (Some(a), Some(b)) => (a, b),
            _ => return Some(Shape::dynamic()),
        };
        let rank = a.len().max(b.len());
        let mut dims = Dims::with_capacity(rank);
        for axis in 0..rank {
            let lhs = axis
                .checked_sub(rank - a.len())
                .map_or(Dimension::Static(1), |i| a[i]);
            let rhs = axis
                .checked_sub(rank - b.len())
                .map_or(Dimension::Static(1), |i| b[i]);
            dims.push(lhs.broadcast(rhs)?);
        }
        Some(Shape { dims: Some(dims) })
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::from_static(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::from_static(&dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::from_static(&dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => f.write_str("[...]"),
            Some(dims) => {
                let dims = dims.iter().map(|d| d.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", dims.join(","))
            }
        }
    }
}

/// Normalizes a possibly negative axis against `rank`.
pub fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = i64::try_from(rank).ok()?;
    let resolved = if axis < 0 { axis + rank } else { axis };
    (0..rank).contains(&resolved).then_some(resolved as usize)
}
