//! Semantic types carried by tree nodes

use serde::{Deserialize, Serialize};

/// Resolved semantic type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    /// UTF-16 code unit
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    /// Homogeneous array or collection
    Array(Box<Type>),
    /// Unit type ()
    Unit,
    /// Host type the engine knows only by name
    Named(String),
}

/// Numeric category of a type, as reported by the type oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCategory {
    SignedInteger,
    UnsignedInteger,
    FloatingPoint,
    Boolean,
    Character,
    String,
    Other,
}

impl Type {
    pub fn category(&self) -> TypeCategory {
        match self {
            Type::I8 | Type::I16 | Type::I32 | Type::I64 => TypeCategory::SignedInteger,
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => TypeCategory::UnsignedInteger,
            Type::F32 | Type::F64 => TypeCategory::FloatingPoint,
            Type::Bool => TypeCategory::Boolean,
            Type::Char => TypeCategory::Character,
            Type::String => TypeCategory::String,
            Type::Array(_) | Type::Unit | Type::Named(_) => TypeCategory::Other,
        }
    }

    /// Signed or unsigned integer (characters excluded)
    pub fn is_integer(&self) -> bool {
        matches!(
            self.category(),
            TypeCategory::SignedInteger | TypeCategory::UnsignedInteger
        )
    }

    /// Integer or character: anything with an exact integral value
    pub fn is_integral(&self) -> bool {
        self.is_integer() || *self == Type::Char
    }

    pub fn is_signed(&self) -> bool {
        self.category() == TypeCategory::SignedInteger
    }

    pub fn is_unsigned(&self) -> bool {
        self.category() == TypeCategory::UnsignedInteger
    }

    pub fn is_float(&self) -> bool {
        self.category() == TypeCategory::FloatingPoint
    }

    pub fn is_bool(&self) -> bool {
        *self == Type::Bool
    }

    /// Participates in arithmetic promotion
    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_float()
    }

    /// Width in bits for fixed-width scalar types
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            Type::I8 | Type::U8 => Some(8),
            Type::I16 | Type::U16 | Type::Char => Some(16),
            Type::I32 | Type::U32 | Type::F32 => Some(32),
            Type::I64 | Type::U64 | Type::F64 => Some(64),
            _ => None,
        }
    }

    /// Smallest representable integral value
    pub fn min_value(&self) -> Option<i128> {
        match self {
            Type::I8 => Some(i8::MIN as i128),
            Type::I16 => Some(i16::MIN as i128),
            Type::I32 => Some(i32::MIN as i128),
            Type::I64 => Some(i64::MIN as i128),
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::Char => Some(0),
            _ => None,
        }
    }

    /// Largest representable integral value
    pub fn max_value(&self) -> Option<i128> {
        match self {
            Type::I8 => Some(i8::MAX as i128),
            Type::I16 => Some(i16::MAX as i128),
            Type::I32 => Some(i32::MAX as i128),
            Type::I64 => Some(i64::MAX as i128),
            Type::U8 => Some(u8::MAX as i128),
            Type::U16 | Type::Char => Some(u16::MAX as i128),
            Type::U32 => Some(u32::MAX as i128),
            Type::U64 => Some(u64::MAX as i128),
            _ => None,
        }
    }

    /// Unsigned type of the same promoted width (`i32` -> `u32`, `i64` -> `u64`)
    pub fn to_unsigned(&self) -> Type {
        match self {
            Type::I64 | Type::U64 => Type::U64,
            _ => Type::U32,
        }
    }

    /// Whether `value` fits in this integral type
    pub fn contains(&self, value: i128) -> bool {
        match (self.min_value(), self.max_value()) {
            (Some(lo), Some(hi)) => lo <= value && value <= hi,
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::U8 => write!(f, "u8"),
            Type::U16 => write!(f, "u16"),
            Type::U32 => write!(f, "u32"),
            Type::U64 => write!(f, "u64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::String => write!(f, "string"),
            Type::Array(elem) => write!(f, "{elem}[]"),
            Type::Unit => write!(f, "()"),
            Type::Named(name) => write!(f, "{name}"),
        }
    }
}
