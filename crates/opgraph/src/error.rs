//! Error taxonomy shared by the type system, registry, graph and builder.
//!
//! Every variant is raised before the graph is touched, so a caller that sees an error can assume
//! the graph it was building into is exactly as it was before the call.

use thiserror::Error;

use crate::types::ElementType;

/// Convenience alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid element type '{name}'")]
    InvalidType { name: String },

    #[error("operator '{op}' is not registered in opset '{opset}'")]
    UnknownOperator { opset: String, op: String },

    #[error("operator '{op}' is already registered in opset '{opset}'")]
    DuplicateOperator { opset: String, op: String },

    #[error("{op}: unknown attribute '{name}'")]
    UnknownAttribute { op: String, name: String },

    #[error("{op}: missing required attribute '{name}'")]
    MissingAttribute { op: String, name: String },

    #[error("{op}: attribute '{name}' expects {expected}, got {found}")]
    InvalidAttributeType {
        op: String,
        name: String,
        expected: String,
        found: String,
    },

    #[error("{op}: invalid value for attribute '{name}': {reason}")]
    InvalidAttributeValue {
        op: String,
        name: String,
        reason: String,
    },

    #[error("{op}: expected {expected} input(s), got {found}")]
    ArityMismatch {
        op: String,
        expected: String,
        found: usize,
    },

    #[error("{op}: input {index} ('{input}') has element type {found}, allowed: {allowed}")]
    InvalidInputType {
        op: String,
        index: usize,
        input: String,
        found: ElementType,
        allowed: String,
    },

    #[error("unsupported input: {detail}")]
    UnsupportedInputType { detail: String },

    #[error("input value belongs to graph #{found}, expected graph #{expected}")]
    ForeignInput { expected: u64, found: u64 },

    #[error("node name '{name}' is already used in this graph")]
    DuplicateName { name: String },

    #[error("{op}: shape inference failed: {reason}")]
    ShapeInference { op: String, reason: String },

    #[error("invalid literal: {reason}")]
    InvalidLiteral { reason: String },

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl GraphError {
    pub fn invalid_type(name: impl Into<String>) -> Self {
        GraphError::InvalidType { name: name.into() }
    }

    pub fn unknown_operator(opset: impl Into<String>, op: impl Into<String>) -> Self {
        GraphError::UnknownOperator {
            opset: opset.into(),
            op: op.into(),
        }
    }

    pub fn shape_inference(op: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::ShapeInference {
            op: op.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_input(detail: impl Into<String>) -> Self {
        GraphError::UnsupportedInputType {
            detail: detail.into(),
        }
    }

    pub fn invalid_literal(reason: impl Into<String>) -> Self {
        GraphError::InvalidLiteral {
            reason: reason.into(),
        }
    }

    pub fn invalid_attribute_value(
        op: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GraphError::InvalidAttributeValue {
            op: op.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}
