//! Dense constant payloads and their conversion from Rust and JSON data.
//!
//! A [`TensorLiteral`] stores elements little-endian in a shared byte buffer. `u1` payloads are
//! bit-packed most-significant bit first. Casting goes through an intermediate scalar so integer
//! values up to 64 bits survive without passing through `f64`.

use std::fmt;
use std::sync::Arc;

use half::{bf16, f16};
use serde::{ser::SerializeStruct, Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::types::{ElementType, Shape, TensorSpec};

/// Rust scalar types with a fixed graph element type.
pub trait NativeElement: Copy + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    #[doc(hidden)]
    fn to_scalar(self) -> Scalar;

    /// Appends the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);
}

/// Intermediate representation of one element while encoding or casting.
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i128),
    Float(f64),
}

impl Scalar {
    fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(v) => u8::from(v) as f64,
            Scalar::Int(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }

    fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(v) => v,
            Scalar::Int(v) => v != 0,
            Scalar::Float(v) => v != 0.0,
        }
    }

    /// Integer view; fractional floats truncate toward zero.
    fn as_int(self) -> (i128, bool) {
        match self {
            Scalar::Bool(v) => (i128::from(v), false),
            Scalar::Int(v) => (v, false),
            Scalar::Float(v) => (v as i128, v.fract() != 0.0),
        }
    }
}

macro_rules! native_int {
    ($($ty:ty => $et:ident),* $(,)?) => {
        $(impl NativeElement for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$et;

            fn to_scalar(self) -> Scalar {
                Scalar::Int(i128::from(self))
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

native_int!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
);

impl NativeElement for bool {
    const ELEMENT_TYPE: ElementType = ElementType::Boolean;

    fn to_scalar(self) -> Scalar {
        Scalar::Bool(self)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

impl NativeElement for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;

    fn to_scalar(self) -> Scalar {
        Scalar::Float(f64::from(self))
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl NativeElement for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::F64;

    fn to_scalar(self) -> Scalar {
        Scalar::Float(self)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl NativeElement for f16 {
    const ELEMENT_TYPE: ElementType = ElementType::F16;

    fn to_scalar(self) -> Scalar {
        Scalar::Float(self.to_f64())
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl NativeElement for bf16 {
    const ELEMENT_TYPE: ElementType = ElementType::Bf16;

    fn to_scalar(self) -> Scalar {
        Scalar::Float(self.to_f64())
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// Dense literal tensor payload with a fully static shape.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TensorLiteral {
    element_type: ElementType,
    dims: Vec<usize>,
    bytes: Arc<[u8]>,
}

impl TensorLiteral {
    /// Wraps raw little-endian bytes, checking the length against type and dims.
    pub fn new(element_type: ElementType, dims: Vec<usize>, bytes: Arc<[u8]>) -> Result<Self> {
        if element_type.is_dynamic() {
            return Err(GraphError::invalid_type(element_type.name()));
        }
        let expected = TensorSpec::new(element_type, Shape::from_static(&dims))
            .byte_len()
            .ok_or_else(|| GraphError::invalid_literal("element count overflows usize"))?;
        if bytes.len() != expected {
            return Err(GraphError::invalid_literal(format!(
                "{} x {:?} needs {expected} bytes, got {}",
                element_type,
                dims,
                bytes.len()
            )));
        }
        Ok(Self {
            element_type,
            dims,
            bytes,
        })
    }

    pub fn scalar<T: NativeElement>(value: T) -> Self {
        Self::from_native(Vec::new(), &[value])
    }

    /// Builds a literal from row-major data; `data.len()` must equal the product of `dims`.
    pub fn from_vec<T: NativeElement>(dims: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self> {
        let dims = dims.into();
        let expected = checked_count(&dims)?;
        if expected != data.len() {
            return Err(GraphError::invalid_literal(format!(
                "dims {:?} hold {expected} elements, got {}",
                dims,
                data.len()
            )));
        }
        Ok(Self::from_native(dims, &data))
    }

    /// One-dimensional literal.
    pub fn from_slice<T: NativeElement>(data: &[T]) -> Self {
        Self::from_native(vec![data.len()], data)
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn shape(&self) -> Shape {
        Shape::from_static(&self.dims)
    }

    pub fn spec(&self) -> TensorSpec {
        TensorSpec::new(self.element_type, self.shape())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Decodes every element as `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.decode().into_iter().map(Scalar::as_f64).collect()
    }

    /// Decodes an integral literal as `i64`; fails for floating-point payloads.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        if !self.element_type.is_integral() {
            return Err(GraphError::invalid_literal(format!(
                "expected an integer literal, got {}",
                self.element_type
            )));
        }
        self.decode()
            .into_iter()
            .map(|scalar| {
                let (value, _) = scalar.as_int();
                i64::try_from(value)
                    .map_err(|_| GraphError::invalid_literal(format!("{value} exceeds i64")))
            })
            .collect()
    }

    /// Converts the payload to another element type.
    pub fn cast(&self, target: ElementType) -> Result<Self> {
        if target == self.element_type {
            return Ok(self.clone());
        }
        if target.is_dynamic() {
            return Err(GraphError::invalid_type(target.name()));
        }
        let scalars = self.decode();
        Self::from_scalars(target, self.dims.clone(), &scalars)
    }

    /// Decodes a JSON number, boolean, or rectangular nested array.
    ///
    /// Integers infer `i64`, or `u64` when some value exceeds `i64::MAX` and none is negative.
    /// Any float, or integers fitting neither, infer `f64`. Booleans infer `boolean`; empty
    /// arrays default to `f64`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let mut dims = Vec::new();
        let mut leaves = Vec::new();
        let mut leaf_depth = None;
        collect_json(value, 0, &mut dims, &mut leaves, &mut leaf_depth)?;

        let all_bool = leaves.iter().all(|leaf| leaf.is_boolean());
        let any_bool = leaves.iter().any(|leaf| leaf.is_boolean());
        if any_bool && !all_bool {
            return Err(GraphError::unsupported_input(
                "array mixes booleans and numbers",
            ));
        }

        let element_type = if leaves.is_empty() {
            ElementType::F64
        } else if all_bool {
            ElementType::Boolean
        } else if leaves.iter().all(|leaf| leaf.is_i64()) {
            ElementType::I64
        } else if leaves.iter().all(|leaf| leaf.is_u64()) {
            ElementType::U64
        } else {
            ElementType::F64
        };

        let scalars = leaves
            .iter()
            .map(|leaf| match leaf {
                serde_json::Value::Bool(v) => Scalar::Bool(*v),
                serde_json::Value::Number(n) => {
                    if let Some(v) = n.as_i64() {
                        Scalar::Int(i128::from(v))
                    } else if let Some(v) = n.as_u64() {
                        Scalar::Int(i128::from(v))
                    } else {
                        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
                    }
                }
                _ => Scalar::Float(f64::NAN),
            })
            .collect::<Vec<_>>();
        Self::from_scalars(element_type, dims, &scalars)
    }

    fn from_native<T: NativeElement>(dims: Vec<usize>, data: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(data.len() * T::ELEMENT_TYPE.size_in_bytes());
        for value in data {
            value.write_le(&mut bytes);
        }
        Self {
            element_type: T::ELEMENT_TYPE,
            dims,
            bytes: Arc::from(bytes),
        }
    }

    fn from_scalars(
        element_type: ElementType,
        dims: Vec<usize>,
        scalars: &[Scalar],
    ) -> Result<Self> {
        let bytes = encode(element_type, scalars)?;
        Self::new(element_type, dims, Arc::from(bytes))
    }

    fn decode(&self) -> Vec<Scalar> {
        let bytes = &self.bytes[..];
        let count = self.element_count();
        match self.element_type {
            ElementType::Dynamic => Vec::new(),
            ElementType::Boolean => bytes.iter().map(|b| Scalar::Bool(*b != 0)).collect(),
            ElementType::U1 => (0..count)
                .map(|i| Scalar::Int(i128::from((bytes[i / 8] >> (7 - i % 8)) & 1)))
                .collect(),
            ElementType::Bf16 => chunks::<2>(bytes)
                .map(|c| Scalar::Float(bf16::from_le_bytes(c).to_f64()))
                .collect(),
            ElementType::F16 => chunks::<2>(bytes)
                .map(|c| Scalar::Float(f16::from_le_bytes(c).to_f64()))
                .collect(),
            ElementType::F32 => chunks::<4>(bytes)
                .map(|c| Scalar::Float(f64::from(f32::from_le_bytes(c))))
                .collect(),
            ElementType::F64 => chunks::<8>(bytes)
                .map(|c| Scalar::Float(f64::from_le_bytes(c)))
                .collect(),
            ElementType::I8 => bytes.iter().map(|b| Scalar::Int(i128::from(*b as i8))).collect(),
            ElementType::I16 => chunks::<2>(bytes)
                .map(|c| Scalar::Int(i128::from(i16::from_le_bytes(c))))
                .collect(),
            ElementType::I32 => chunks::<4>(bytes)
                .map(|c| Scalar::Int(i128::from(i32::from_le_bytes(c))))
                .collect(),
            ElementType::I64 => chunks::<8>(bytes)
                .map(|c| Scalar::Int(i128::from(i64::from_le_bytes(c))))
                .collect(),
            ElementType::U8 => bytes.iter().map(|b| Scalar::Int(i128::from(*b))).collect(),
            ElementType::U16 => chunks::<2>(bytes)
                .map(|c| Scalar::Int(i128::from(u16::from_le_bytes(c))))
                .collect(),
            ElementType::U32 => chunks::<4>(bytes)
                .map(|c| Scalar::Int(i128::from(u32::from_le_bytes(c))))
                .collect(),
            ElementType::U64 => chunks::<8>(bytes)
                .map(|c| Scalar::Int(i128::from(u64::from_le_bytes(c))))
                .collect(),
        }
    }
}

impl fmt::Debug for TensorLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorLiteral")
            .field("element_type", &self.element_type)
            .field("dims", &self.dims)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Serialize for TensorLiteral {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TensorLiteral", 3)?;
        state.serialize_field("element_type", &self.element_type)?;
        state.serialize_field("dims", &self.dims)?;
        state.serialize_field("bytes", self.bytes.as_ref())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for TensorLiteral {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorLiteralHelper {
            element_type: ElementType,
            dims: Vec<usize>,
            bytes: Vec<u8>,
        }

        let helper = TensorLiteralHelper::deserialize(deserializer)?;
        TensorLiteral::new(helper.element_type, helper.dims, Arc::from(helper.bytes))
            .map_err(serde::de::Error::custom)
    }
}

fn checked_count(dims: &[usize]) -> Result<usize> {
    dims.iter().try_fold(1usize, |acc, dim| {
        acc.checked_mul(*dim)
            .ok_or_else(|| GraphError::invalid_literal("element count overflows usize"))
    })
}

fn chunks<const N: usize>(bytes: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
    bytes.chunks_exact(N).map(|chunk| {
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        out
    })
}

fn encode(element_type: ElementType, scalars: &[Scalar]) -> Result<Vec<u8>> {
    let width = element_type.size_in_bytes();
    let mut out = Vec::with_capacity(scalars.len() * width);
    let mut lossy = false;
    match element_type {
        ElementType::Dynamic => return Err(GraphError::invalid_type(element_type.name())),
        ElementType::Boolean => out.extend(scalars.iter().map(|s| u8::from(s.as_bool()))),
        ElementType::U1 => {
            out.resize(scalars.len().div_ceil(8), 0);
            for (i, scalar) in scalars.iter().enumerate() {
                if scalar.as_bool() {
                    out[i / 8] |= 1 << (7 - i % 8);
                }
            }
        }
        ElementType::Bf16 => {
            for s in scalars {
                out.extend_from_slice(&bf16::from_f64(s.as_f64()).to_le_bytes());
            }
        }
        ElementType::F16 => {
            for s in scalars {
                out.extend_from_slice(&f16::from_f64(s.as_f64()).to_le_bytes());
            }
        }
        ElementType::F32 => {
            for s in scalars {
                out.extend_from_slice(&(s.as_f64() as f32).to_le_bytes());
            }
        }
        ElementType::F64 => {
            for s in scalars {
                out.extend_from_slice(&s.as_f64().to_le_bytes());
            }
        }
        _ => {
            for s in scalars {
                let (value, fractional) = s.as_int();
                lossy |= fractional;
                encode_int(element_type, value, &mut out)?;
            }
        }
    }
    if lossy {
        tracing::warn!(
            target_type = %element_type,
            "fractional values truncated while building integer literal"
        );
    }
    Ok(out)
}

fn encode_int(element_type: ElementType, value: i128, out: &mut Vec<u8>) -> Result<()> {
    macro_rules! put {
        ($ty:ty) => {{
            let narrowed = <$ty>::try_from(value).map_err(|_| {
                GraphError::invalid_literal(format!(
                    "value {value} is out of range for {element_type}"
                ))
            })?;
            out.extend_from_slice(&narrowed.to_le_bytes());
        }};
    }

    match element_type {
        ElementType::I8 => put!(i8),
        ElementType::I16 => put!(i16),
        ElementType::I32 => put!(i32),
        ElementType::I64 => put!(i64),
        ElementType::U8 => put!(u8),
        ElementType::U16 => put!(u16),
        ElementType::U32 => put!(u32),
        ElementType::U64 => put!(u64),
        other => return Err(GraphError::invalid_type(other.name())),
    }
    Ok(())
}

fn collect_json<'a>(
    value: &'a serde_json::Value,
    depth: usize,
    dims: &mut Vec<usize>,
    leaves: &mut Vec<&'a serde_json::Value>,
    leaf_depth: &mut Option<usize>,
) -> Result<()> {
    match value {
        serde_json::Value::Array(items) => {
            if leaf_depth.is_some_and(|d| d <= depth) {
                return Err(GraphError::unsupported_input("ragged nested array"));
            }
            if dims.len() == depth {
                dims.push(items.len());
            } else if dims[depth] != items.len() {
                return Err(GraphError::unsupported_input("ragged nested array"));
            }
            for item in items {
                collect_json(item, depth + 1, dims, leaves, leaf_depth)?;
            }
            Ok(())
        }
        serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
            match *leaf_depth {
                None if dims.len() == depth => *leaf_depth = Some(depth),
                Some(d) if d == depth => {}
                _ => return Err(GraphError::unsupported_input("ragged nested array")),
            }
            leaves.push(value);
            Ok(())
        }
        serde_json::Value::Null => Err(GraphError::unsupported_input("null is not a tensor value")),
        serde_json::Value::String(s) => Err(GraphError::unsupported_input(format!(
            "string '{s}' is not a tensor value"
        ))),
        serde_json::Value::Object(_) => {
            Err(GraphError::unsupported_input("object is not a tensor value"))
        }
    }
}
