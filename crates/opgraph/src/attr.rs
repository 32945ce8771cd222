//! Operator attributes: a closed set of literal kinds plus the per-operator schema they are
//! validated against.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute payload.
///
/// Attributes are limited to simple primitives and homogeneous lists so they are easy to compare,
/// serialize and validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum AttrValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Bools(Vec<bool>),
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::String(_) => AttrKind::String,
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Float(_) => AttrKind::Float,
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::Strings(_) => AttrKind::Strings,
            AttrValue::Ints(_) => AttrKind::Ints,
            AttrValue::Floats(_) => AttrKind::Floats,
            AttrValue::Bools(_) => AttrKind::Bools,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            AttrValue::Ints(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            AttrValue::Floats(v) => Some(v),
            _ => None,
        }
    }

    /// Coerces `self` to `kind`, allowing only the declared integer-to-float widening.
    pub(crate) fn coerce(self, kind: AttrKind) -> Result<AttrValue, AttrValue> {
        match (self, kind) {
            (value, kind) if value.kind() == kind => Ok(value),
            (AttrValue::Int(v), AttrKind::Float) => Ok(AttrValue::Float(v as f64)),
            (AttrValue::Ints(v), AttrKind::Floats) => {
                Ok(AttrValue::Floats(v.into_iter().map(|x| x as f64).collect()))
            }
            (value, _) => Err(value),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(v) => write!(f, "{v:?}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v:?}"),
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Strings(v) => write!(f, "{v:?}"),
            AttrValue::Ints(v) => write!(f, "{v:?}"),
            AttrValue::Floats(v) => write!(f, "{v:?}"),
            AttrValue::Bools(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! attr_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for AttrValue {
            fn from(value: $ty) -> Self {
                AttrValue::$variant(value.into())
            }
        })*
    };
}

attr_from!(
    String => String,
    &str => String,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    Vec<String> => Strings,
    Vec<i64> => Ints,
    Vec<f64> => Floats,
    Vec<bool> => Bools,
);

impl From<&[i64]> for AttrValue {
    fn from(value: &[i64]) -> Self {
        AttrValue::Ints(value.to_vec())
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::Strings(value.into_iter().map(str::to_string).collect())
    }
}

/// Discriminant of [`AttrValue`], used in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrKind {
    String,
    Int,
    Float,
    Bool,
    Strings,
    Ints,
    Floats,
    Bools,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrKind::String => "string",
            AttrKind::Int => "int",
            AttrKind::Float => "float",
            AttrKind::Bool => "bool",
            AttrKind::Strings => "list<string>",
            AttrKind::Ints => "list<int>",
            AttrKind::Floats => "list<float>",
            AttrKind::Bools => "list<bool>",
        };
        f.write_str(name)
    }
}

/// Extra check applied after the kind and choice checks pass.
pub type AttrValidator = fn(&AttrValue) -> Result<(), String>;

/// Declaration of one attribute in an operator schema.
#[derive(Debug, Clone)]
pub struct AttrSpec {
    pub name: &'static str,
    pub kind: AttrKind,
    pub required: bool,
    pub default: Option<AttrValue>,
    pub choices: Option<&'static [&'static str]>,
    pub validator: Option<AttrValidator>,
}

impl AttrSpec {
    pub fn required(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            choices: None,
            validator: None,
        }
    }

    /// Optional attribute without a default; omitted values stay absent.
    pub fn optional(name: &'static str, kind: AttrKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Optional attribute that is filled with `default` when omitted.
    pub fn with_default(name: &'static str, default: impl Into<AttrValue>) -> Self {
        let default = default.into();
        Self {
            kind: default.kind(),
            default: Some(default),
            ..Self::optional(name, AttrKind::String)
        }
    }

    /// Restricts a string attribute to an enumerated set of values.
    pub fn choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn validate(mut self, validator: AttrValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// Ordered attribute map attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// Builds an [`Attributes`] map from `name => value` pairs.
///
/// ```
/// let attrs = opgraph::attrs! { "approximation_mode" => "tanh" };
/// assert_eq!(attrs.len(), 1);
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::attr::Attributes::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut attrs = $crate::attr::Attributes::new();
        $(attrs.insert($name, $value);)+
        attrs
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_widens_ints_only_into_floats() {
        assert_eq!(
            AttrValue::Int(2).coerce(AttrKind::Float),
            Ok(AttrValue::Float(2.0))
        );
        assert_eq!(
            AttrValue::Ints(vec![1, 2]).coerce(AttrKind::Floats),
            Ok(AttrValue::Floats(vec![1.0, 2.0]))
        );
        assert!(AttrValue::Float(2.0).coerce(AttrKind::Int).is_err());
        assert!(AttrValue::Bool(true).coerce(AttrKind::Int).is_err());
    }
}
