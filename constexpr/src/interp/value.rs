//! Runtime values for the interpreter

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Type;

/// Runtime value. "Unknown" is modelled as the absence of a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    /// Array, collection or tuple contents
    Array(Vec<Value>),
    Unit,
}

impl Value {
    /// Semantic type of this value
    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Char(_) => Type::Char,
            Value::I8(_) => Type::I8,
            Value::I16(_) => Type::I16,
            Value::I32(_) => Type::I32,
            Value::I64(_) => Type::I64,
            Value::U8(_) => Type::U8,
            Value::U16(_) => Type::U16,
            Value::U32(_) => Type::U32,
            Value::U64(_) => Type::U64,
            Value::F32(_) => Type::F32,
            Value::F64(_) => Type::F64,
            Value::Str(_) => Type::String,
            Value::Array(items) => Type::Array(Box::new(
                items.first().map(Value::ty).unwrap_or(Type::Unit),
            )),
            Value::Unit => Type::Unit,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> String {
        self.ty().to_string()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Exact integral value; characters yield their code unit
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Char(c) => Some(*c as u32 as i128),
            Value::I8(n) => Some(*n as i128),
            Value::I16(n) => Some(*n as i128),
            Value::I32(n) => Some(*n as i128),
            Value::I64(n) => Some(*n as i128),
            Value::U8(n) => Some(*n as i128),
            Value::U16(n) => Some(*n as i128),
            Value::U32(n) => Some(*n as i128),
            Value::U64(n) => Some(*n as i128),
            _ => None,
        }
    }

    /// Numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(f) => Some(*f as f64),
            Value::F64(f) => Some(*f),
            other => other.as_i128().map(|n| n as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        self.as_i128().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::F32(_) | Value::F64(_))
    }

    /// Build an integral value of type `ty`, wrapping to its width
    pub fn from_i128(ty: &Type, n: i128) -> Option<Value> {
        Some(match ty {
            Type::I8 => Value::I8(n as i8),
            Type::I16 => Value::I16(n as i16),
            Type::I32 => Value::I32(n as i32),
            Type::I64 => Value::I64(n as i64),
            Type::U8 => Value::U8(n as u8),
            Type::U16 => Value::U16(n as u16),
            Type::U32 => Value::U32(n as u32),
            Type::U64 => Value::U64(n as u64),
            Type::Char => Value::Char(char::from_u32(n as u16 as u32)?),
            Type::F32 => Value::F32(n as f32),
            Type::F64 => Value::F64(n as f64),
            _ => return None,
        })
    }

    /// Build a floating-point value of type `ty`
    pub fn from_f64(ty: &Type, f: f64) -> Option<Value> {
        match ty {
            Type::F32 => Some(Value::F32(f as f32)),
            Type::F64 => Some(Value::F64(f)),
            _ => None,
        }
    }

    pub fn zero(ty: &Type) -> Option<Value> {
        Value::from_i128(ty, 0)
    }

    /// Value with every bit set: -1 for signed, MAX for unsigned
    pub fn all_ones(ty: &Type) -> Option<Value> {
        if ty.is_integer() {
            Value::from_i128(ty, -1)
        } else {
            None
        }
    }

    /// Integral or floating zero (either sign)
    pub fn is_zero(&self) -> bool {
        match self {
            Value::F32(f) => *f == 0.0,
            Value::F64(f) => *f == 0.0,
            other => other.as_i128() == Some(0),
        }
    }

    /// Positive floating zero or integral zero
    pub fn is_positive_zero(&self) -> bool {
        match self {
            Value::F32(f) => *f == 0.0 && f.is_sign_positive(),
            Value::F64(f) => *f == 0.0 && f.is_sign_positive(),
            other => other.as_i128() == Some(0),
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Value::F32(f) => *f == 1.0,
            Value::F64(f) => *f == 1.0,
            Value::Char(_) => false,
            other => other.as_i128() == Some(1),
        }
    }

    pub fn is_minus_one(&self) -> bool {
        match self {
            Value::F32(f) => *f == -1.0,
            Value::F64(f) => *f == -1.0,
            other => other.as_i128() == Some(-1),
        }
    }

    pub fn is_all_ones(&self) -> bool {
        let ty = self.ty();
        ty.is_integer() && Value::all_ones(&ty).as_ref() == Some(self)
    }

    /// Explicit numeric conversion with wrapping integer semantics and
    /// saturating float-to-integer truncation
    pub fn cast(&self, ty: &Type) -> Option<Value> {
        if self.ty() == *ty {
            return Some(self.clone());
        }
        match self {
            Value::F32(_) | Value::F64(_) => {
                let f = self.as_f64()?;
                match ty {
                    Type::F32 | Type::F64 => Value::from_f64(ty, f),
                    Type::I8 => Some(Value::I8(f as i8)),
                    Type::I16 => Some(Value::I16(f as i16)),
                    Type::I32 => Some(Value::I32(f as i32)),
                    Type::I64 => Some(Value::I64(f as i64)),
                    Type::U8 => Some(Value::U8(f as u8)),
                    Type::U16 => Some(Value::U16(f as u16)),
                    Type::U32 => Some(Value::U32(f as u32)),
                    Type::U64 => Some(Value::U64(f as u64)),
                    Type::Char => Value::from_i128(ty, f as u16 as i128),
                    _ => None,
                }
            }
            other => {
                let n = other.as_i128()?;
                match ty {
                    Type::F32 => Some(Value::F32(n as f32)),
                    Type::F64 => Some(Value::F64(n as f64)),
                    _ => Value::from_i128(ty, n),
                }
            }
        }
    }
}

/// Identity rather than numeric equality: values of different types are
/// distinct and floats compare by bit pattern, so `0.0 != -0.0` and a NaN
/// equals itself. Numeric comparison lives in `numeric::compare`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::I8(n) => write!(f, "{n}"),
            Value::I16(n) => write!(f, "{n}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::U8(n) => write!(f, "{n}"),
            Value::U16(n) => write!(f, "{n}"),
            Value::U32(n) => write!(f, "{n}"),
            Value::U64(n) => write!(f, "{n}"),
            Value::F32(x) => write!(f, "{x:?}"),
            Value::F64(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Unit => write!(f, "()"),
        }
    }
}
