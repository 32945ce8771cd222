//! Typed computational-graph builder.
//!
//! Graphs are assembled from operators looked up by `(opset, op)` in an [`OpRegistry`]. Each
//! operator declares its arity, accepted input element types, attribute schema and a shape
//! inference rule, so every node is validated and typed the moment it is created.
//!
//! ```
//! use opgraph::ops::opset7;
//! use opgraph::{ElementType, GraphBuilder};
//!
//! # fn main() -> opgraph::Result<()> {
//! let builder = GraphBuilder::new();
//! let x = builder.parameter(ElementType::F32, [2usize, 3], Some("x"))?;
//! let y = opset7::gelu(&builder, &x, "tanh", None)?;
//! assert_eq!(y.spec(), x.spec());
//! # Ok(())
//! # }
//! ```

pub mod attr;
pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod literal;
pub mod ops;
pub mod registry;
pub mod snapshot;
pub mod types;

pub use attr::{AttrKind, AttrSpec, AttrValue, Attributes};
pub use builder::{GraphBuilder, NodeInput};
pub use config::BuilderConfig;
pub use error::{GraphError, Result};
pub use graph::{Graph, GraphId, Node, NodeDraft, NodeId, Value};
pub use literal::{NativeElement, TensorLiteral};
pub use registry::{builtin_registry, OpInput, OpRegistry, OpSchema, TypeSet};
pub use snapshot::GraphSnapshot;
pub use types::{Dimension, ElementType, Shape, TensorSpec};
