//! Scalar literal values

use crate::types::{Primitive, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Primitive, boxed or string value
///
/// Floating point values compare and hash by bit pattern so literals can be
/// interned and used as map keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Literal {
    /// Boolean
    Bool(bool),
    /// Character
    Char(char),
    /// 8-bit integer
    Byte(i8),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Text
    Str(String),
}

impl Literal {
    /// Zero value of a primitive kind
    #[must_use]
    pub fn zero(kind: Primitive) -> Self {
        match kind {
            Primitive::Bool => Self::Bool(false),
            Primitive::Char => Self::Char('\0'),
            Primitive::Byte => Self::Byte(0),
            Primitive::Short => Self::Short(0),
            Primitive::Int => Self::Int(0),
            Primitive::Long => Self::Long(0),
            Primitive::Float => Self::Float(0.0),
            Primitive::Double => Self::Double(0.0),
        }
    }

    /// Primitive kind, `None` for strings
    #[must_use]
    pub fn primitive(&self) -> Option<Primitive> {
        Some(match self {
            Self::Bool(_) => Primitive::Bool,
            Self::Char(_) => Primitive::Char,
            Self::Byte(_) => Primitive::Byte,
            Self::Short(_) => Primitive::Short,
            Self::Int(_) => Primitive::Int,
            Self::Long(_) => Primitive::Long,
            Self::Float(_) => Primitive::Float,
            Self::Double(_) => Primitive::Double,
            Self::Str(_) => return None,
        })
    }

    /// Boxed or `String` type of the value
    #[must_use]
    pub fn natural_type(&self) -> TypeRef {
        self.primitive()
            .map_or_else(TypeRef::string, TypeRef::boxed)
    }

    fn key(&self) -> (u8, u64, Option<&str>) {
        match self {
            Self::Bool(v) => (0, u64::from(*v), None),
            Self::Char(v) => (1, u64::from(*v), None),
            Self::Byte(v) => (2, i64::from(*v) as u64, None),
            Self::Short(v) => (3, i64::from(*v) as u64, None),
            Self::Int(v) => (4, i64::from(*v) as u64, None),
            Self::Long(v) => (5, *v as u64, None),
            Self::Float(v) => (6, u64::from(v.to_bits()), None),
            Self::Double(v) => (7, v.to_bits(), None),
            Self::Str(v) => (8, 0, Some(v)),
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
