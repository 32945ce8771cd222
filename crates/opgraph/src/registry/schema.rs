//! Declarative operator schemas and the context handed to shape inference.

use std::fmt;
use std::sync::Arc;

use crate::attr::{AttrKind, AttrSpec, AttrValue, Attributes};
use crate::error::{GraphError, Result};
use crate::graph::DraftInput;
use crate::literal::TensorLiteral;
use crate::types::{ElementType, TensorSpec};

/// Computes output specs from validated inputs and normalized attributes.
pub type InferFn = fn(&InferContext<'_>) -> Result<Vec<TensorSpec>>;

/// Element types an input accepts. A dynamic element type is accepted by every set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSet {
    Any,
    /// Floating-point types.
    Float,
    /// Floating-point and integer types, excluding `boolean`.
    Numeric,
    /// Integer types, excluding `boolean`.
    Integer,
    /// Signed integers and floating-point types.
    Signed,
    Only(&'static [ElementType]),
}

impl TypeSet {
    pub fn contains(self, element_type: ElementType) -> bool {
        if element_type.is_dynamic() {
            return true;
        }
        match self {
            TypeSet::Any => true,
            TypeSet::Float => element_type.is_real(),
            TypeSet::Numeric => element_type.is_real() || element_type.is_integral_number(),
            TypeSet::Integer => element_type.is_integral_number(),
            TypeSet::Signed => element_type.is_signed() && element_type != ElementType::Boolean,
            TypeSet::Only(types) => types.contains(&element_type),
        }
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSet::Any => f.write_str("any"),
            TypeSet::Float => f.write_str("floating-point"),
            TypeSet::Numeric => f.write_str("numeric"),
            TypeSet::Integer => f.write_str("integer"),
            TypeSet::Signed => f.write_str("signed numeric"),
            TypeSet::Only(types) => {
                let names = types.iter().map(|t| t.name()).collect::<Vec<_>>();
                write!(f, "{{{}}}", names.join(", "))
            }
        }
    }
}

/// Fixed or variadic input count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic { min: usize },
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Variadic { min } => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic { min } => write!(f, "at least {min}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputSpec {
    pub name: &'static str,
    pub types: TypeSet,
}

/// Everything the registry needs to validate and infer one operator.
#[derive(Debug, Clone)]
pub struct OpSchema {
    pub(crate) op: Arc<str>,
    pub(crate) inputs: Vec<InputSpec>,
    pub(crate) arity: Arity,
    pub(crate) attrs: Vec<AttrSpec>,
    pub(crate) infer: InferFn,
}

impl OpSchema {
    pub fn new(op: &str, infer: InferFn) -> Self {
        OpSchema {
            op: Arc::from(op),
            inputs: Vec::new(),
            arity: Arity::Fixed(0),
            attrs: Vec::new(),
            infer,
        }
    }

    /// Appends a positional input.
    pub fn input(mut self, name: &'static str, types: TypeSet) -> Self {
        self.inputs.push(InputSpec { name, types });
        self.arity = Arity::Fixed(self.inputs.len());
        self
    }

    /// Makes the operator take any number (at least `min`) of inputs sharing one type set.
    pub fn variadic(mut self, name: &'static str, types: TypeSet, min: usize) -> Self {
        self.inputs = vec![InputSpec { name, types }];
        self.arity = Arity::Variadic { min };
        self
    }

    pub fn attr(mut self, spec: AttrSpec) -> Self {
        self.attrs.push(spec);
        self
    }

    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn attrs(&self) -> &[AttrSpec] {
        &self.attrs
    }

    pub fn attr_spec(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|spec| spec.name == name)
    }

    fn input_spec(&self, index: usize) -> Option<&InputSpec> {
        match self.arity {
            Arity::Fixed(_) => self.inputs.get(index),
            Arity::Variadic { .. } => self.inputs.first(),
        }
    }

    pub(crate) fn check_arity(&self, count: usize) -> Result<()> {
        if !self.arity.accepts(count) {
            return Err(GraphError::ArityMismatch {
                op: self.op.to_string(),
                expected: self.arity.to_string(),
                found: count,
            });
        }
        Ok(())
    }

    pub(crate) fn check_input_types(&self, inputs: &[OpInput]) -> Result<()> {
        for (index, input) in inputs.iter().enumerate() {
            let Some(spec) = self.input_spec(index) else {
                continue;
            };
            let found = input.spec.element_type;
            if !spec.types.contains(found) {
                return Err(GraphError::InvalidInputType {
                    op: self.op.to_string(),
                    index,
                    input: spec.name.to_string(),
                    found,
                    allowed: spec.types.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validates `attrs` against the schema and fills in defaults.
    pub(crate) fn normalize_attrs(&self, mut attrs: Attributes) -> Result<Attributes> {
        if let Some(unknown) = attrs.names().find(|name| self.attr_spec(name).is_none()) {
            return Err(GraphError::UnknownAttribute {
                op: self.op.to_string(),
                name: unknown.to_string(),
            });
        }

        let mut normalized = Attributes::new();
        for spec in &self.attrs {
            let value = match attrs.remove(spec.name) {
                Some(value) => self.check_attr(spec, value)?,
                None if spec.required => {
                    return Err(GraphError::MissingAttribute {
                        op: self.op.to_string(),
                        name: spec.name.to_string(),
                    })
                }
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            normalized.insert(spec.name, value);
        }
        Ok(normalized)
    }

    fn check_attr(&self, spec: &AttrSpec, value: AttrValue) -> Result<AttrValue> {
        let value = value
            .coerce(spec.kind)
            .map_err(|original| GraphError::InvalidAttributeType {
                op: self.op.to_string(),
                name: spec.name.to_string(),
                expected: spec.kind.to_string(),
                found: original.kind().to_string(),
            })?;

        if let Some(choices) = spec.choices {
            let accepted = match (&value, spec.kind) {
                (AttrValue::String(s), AttrKind::String) => choices.contains(&s.as_str()),
                (AttrValue::Strings(items), AttrKind::Strings) => {
                    items.iter().all(|s| choices.contains(&s.as_str()))
                }
                _ => true,
            };
            if !accepted {
                return Err(GraphError::invalid_attribute_value(
                    &*self.op,
                    spec.name,
                    format!("{value} is not one of {choices:?}"),
                ));
            }
        }

        if let Some(validator) = spec.validator {
            validator(&value).map_err(|reason| {
                GraphError::invalid_attribute_value(&*self.op, spec.name, reason)
            })?;
        }
        Ok(value)
    }
}

/// One normalized operator input: where it comes from plus what it carries.
#[derive(Debug, Clone)]
pub struct OpInput {
    pub source: DraftInput,
    pub spec: TensorSpec,
    /// Literal payload when the input is a constant; lets inference read shape tensors.
    pub literal: Option<Arc<TensorLiteral>>,
}

impl OpInput {
    pub fn from_value(value: &crate::graph::Value) -> Self {
        OpInput {
            source: DraftInput::Value(value.clone()),
            spec: value.spec().clone(),
            literal: value.node().literal().cloned(),
        }
    }
}

impl From<&crate::graph::Value> for OpInput {
    fn from(value: &crate::graph::Value) -> Self {
        OpInput::from_value(value)
    }
}

impl From<crate::graph::Value> for OpInput {
    fn from(value: crate::graph::Value) -> Self {
        OpInput::from_value(&value)
    }
}

/// Read-only view handed to an [`InferFn`].
pub struct InferContext<'a> {
    pub(crate) op: &'a str,
    pub(crate) inputs: &'a [OpInput],
    pub(crate) attrs: &'a Attributes,
    pub(crate) payload: Option<&'a TensorLiteral>,
}

impl<'a> InferContext<'a> {
    pub fn op(&self) -> &str {
        self.op
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, index: usize) -> Result<&'a TensorSpec> {
        self.inputs
            .get(index)
            .map(|input| &input.spec)
            .ok_or_else(|| self.fail(format!("missing input {index}")))
    }

    pub fn inputs(&self) -> impl Iterator<Item = &'a TensorSpec> {
        self.inputs.iter().map(|input| &input.spec)
    }

    /// Constant payload feeding input `index`, if any.
    pub fn literal(&self, index: usize) -> Option<&'a TensorLiteral> {
        self.inputs.get(index)?.literal.as_deref()
    }

    /// Literal attached to the node itself (`Constant`).
    pub fn payload(&self) -> Option<&'a TensorLiteral> {
        self.payload
    }

    pub fn attr(&self, name: &str) -> Option<&'a AttrValue> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Result<&'a str> {
        self.attr(name)
            .and_then(AttrValue::as_str)
            .ok_or_else(|| self.fail(format!("attribute '{name}' is not a string")))
    }

    pub fn attr_int(&self, name: &str) -> Result<i64> {
        self.attr(name)
            .and_then(AttrValue::as_int)
            .ok_or_else(|| self.fail(format!("attribute '{name}' is not an int")))
    }

    pub fn attr_float(&self, name: &str) -> Result<f64> {
        self.attr(name)
            .and_then(AttrValue::as_float)
            .ok_or_else(|| self.fail(format!("attribute '{name}' is not a float")))
    }

    pub fn attr_bool(&self, name: &str) -> Result<bool> {
        self.attr(name)
            .and_then(AttrValue::as_bool)
            .ok_or_else(|| self.fail(format!("attribute '{name}' is not a bool")))
    }

    /// Builds a [`GraphError::ShapeInference`] for this operator.
    pub fn fail(&self, reason: impl Into<String>) -> GraphError {
        GraphError::shape_inference(self.op, reason)
    }
}
