//! Enumerates the scalar element types a graph value can carry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Logical element type of a tensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Unknown at construction time; compatible with every other type.
    Dynamic,
    /// Boolean stored in one byte.
    Boolean,
    Bf16,
    F16,
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    /// Single-bit unsigned value, packed.
    U1,
    U8,
    U16,
    U32,
    U64,
}

impl ElementType {
    /// Every element type, in declaration order.
    pub const ALL: [ElementType; 15] = [
        ElementType::Dynamic,
        ElementType::Boolean,
        ElementType::Bf16,
        ElementType::F16,
        ElementType::F32,
        ElementType::F64,
        ElementType::I8,
        ElementType::I16,
        ElementType::I32,
        ElementType::I64,
        ElementType::U1,
        ElementType::U8,
        ElementType::U16,
        ElementType::U32,
        ElementType::U64,
    ];

    /// Canonical short name (`"f32"`, `"boolean"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Dynamic => "dynamic",
            ElementType::Boolean => "boolean",
            ElementType::Bf16 => "bf16",
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U1 => "u1",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
        }
    }

    /// Parses a canonical name or a numpy-style alias (`"float32"`, `"int64"`, `"bool"`).
    ///
    /// Matching ignores ASCII case and surrounding whitespace.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let ty = match normalized.as_str() {
            "dynamic" => ElementType::Dynamic,
            "boolean" | "bool" => ElementType::Boolean,
            "bf16" | "bfloat16" => ElementType::Bf16,
            "f16" | "float16" | "half" => ElementType::F16,
            "f32" | "float32" | "float" => ElementType::F32,
            "f64" | "float64" | "double" => ElementType::F64,
            "i8" | "int8" => ElementType::I8,
            "i16" | "int16" => ElementType::I16,
            "i32" | "int32" => ElementType::I32,
            "i64" | "int64" => ElementType::I64,
            "u1" | "uint1" => ElementType::U1,
            "u8" | "uint8" => ElementType::U8,
            "u16" | "uint16" => ElementType::U16,
            "u32" | "uint32" => ElementType::U32,
            "u64" | "uint64" => ElementType::U64,
            _ => return Err(GraphError::invalid_type(name)),
        };
        Ok(ty)
    }

    /// Bit-width of one element; `0` for [`ElementType::Dynamic`].
    pub fn bitwidth(self) -> usize {
        match self {
            ElementType::Dynamic => 0,
            ElementType::U1 => 1,
            ElementType::Boolean | ElementType::I8 | ElementType::U8 => 8,
            ElementType::Bf16 | ElementType::F16 | ElementType::I16 | ElementType::U16 => 16,
            ElementType::F32 | ElementType::I32 | ElementType::U32 => 32,
            ElementType::F64 | ElementType::I64 | ElementType::U64 => 64,
        }
    }

    /// Storage size rounded up to whole bytes.
    pub fn size_in_bytes(self) -> usize {
        self.bitwidth().div_ceil(8)
    }

    /// `false` only for [`ElementType::Dynamic`].
    pub fn is_static(self) -> bool {
        self != ElementType::Dynamic
    }

    pub fn is_dynamic(self) -> bool {
        self == ElementType::Dynamic
    }

    /// Floating-point types.
    pub fn is_real(self) -> bool {
        matches!(
            self,
            ElementType::Bf16 | ElementType::F16 | ElementType::F32 | ElementType::F64
        )
    }

    /// Integer types, including `boolean` and `u1`.
    pub fn is_integral(self) -> bool {
        self.is_static() && !self.is_real()
    }

    /// Integer types excluding `boolean`.
    pub fn is_integral_number(self) -> bool {
        self.is_integral() && self != ElementType::Boolean
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ElementType::Boolean
                | ElementType::Bf16
                | ElementType::F16
                | ElementType::F32
                | ElementType::F64
                | ElementType::I8
                | ElementType::I16
                | ElementType::I32
                | ElementType::I64
        )
    }

    /// Two types are compatible when either is dynamic or they are equal.
    pub fn compatible(self, other: ElementType) -> bool {
        self.is_dynamic() || other.is_dynamic() || self == other
    }

    /// Merges two types, preferring the static one; `None` when they conflict.
    pub fn merge(self, other: ElementType) -> Option<ElementType> {
        if self.is_dynamic() {
            Some(other)
        } else if other.is_dynamic() || self == other {
            Some(self)
        } else {
            None
        }
    }

    /// Element type of a Rust native scalar.
    pub fn of<T: crate::literal::NativeElement>() -> Self {
        T::ELEMENT_TYPE
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ElementType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        ElementType::from_name(s)
    }
}
