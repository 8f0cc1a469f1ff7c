//! Numeric promotion and operator semantics
//!
//! Binary numeric promotion:
//!
//! | operands                               | result |
//! |----------------------------------------|--------|
//! | either `f64`                           | `f64`  |
//! | either `f32`                           | `f32`  |
//! | either `u64`                           | `u64`  |
//! | either `i64`, or `u32` with a signed   | `i64`  |
//! | either `u32`                           | `u32`  |
//! | anything else (`i8`..`u16`, `char`)    | `i32`  |
//!
//! Integer arithmetic is computed in i128 and wrapped to the result width.
//! Shifts promote only the left operand and mask the count to `width - 1`.

use super::error::{EvalError, EvalResult};
use super::Value;
use crate::ast::{BinOp, Type, UnOp};

/// Common type for a binary numeric operation
pub fn promote(a: &Type, b: &Type) -> Option<Type> {
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    let either = |t: Type| *a == t || *b == t;
    Some(if either(Type::F64) {
        Type::F64
    } else if either(Type::F32) {
        Type::F32
    } else if either(Type::U64) {
        Type::U64
    } else if either(Type::I64) {
        Type::I64
    } else if either(Type::U32) {
        if a.is_signed() || b.is_signed() {
            Type::I64
        } else {
            Type::U32
        }
    } else {
        Type::I32
    })
}

/// Type of `c ? a : b`: the common type of numeric arms, otherwise the
/// arms' shared type
pub fn conditional_type(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    promote(a, b)
}

/// Type of a single operand after unary promotion
pub fn unary_promote(ty: &Type) -> Option<Type> {
    match ty {
        Type::I8 | Type::I16 | Type::I32 | Type::U8 | Type::U16 | Type::Char => Some(Type::I32),
        Type::I64 | Type::U32 | Type::U64 | Type::F32 | Type::F64 => Some(ty.clone()),
        _ => None,
    }
}

/// Type the operator computes in (comparisons compare in the promoted type)
pub fn operating_type(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    match op {
        BinOp::And | BinOp::Or => Some(Type::Bool),
        BinOp::Shl | BinOp::Shr if right.is_integral() => unary_promote(left),
        BinOp::Shl | BinOp::Shr => None,
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor if left.is_bool() && right.is_bool() => {
            Some(Type::Bool)
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
            if left.is_integral() && right.is_integral() {
                promote(left, right)
            } else {
                None
            }
        }
        BinOp::Eq | BinOp::Ne if left == right && !left.is_numeric() => Some(left.clone()),
        _ => promote(left, right),
    }
}

/// Static result type of a binary operation
pub fn binary_result_type(op: BinOp, left: &Type, right: &Type) -> Option<Type> {
    if op.is_comparison() || op.is_logical() {
        return Some(Type::Bool);
    }
    if op == BinOp::Add && (*left == Type::String || *right == Type::String) {
        return Some(Type::String);
    }
    operating_type(op, left, right)
}

/// Static result type of a unary operation
pub fn unary_result_type(op: UnOp, ty: &Type) -> Option<Type> {
    match op {
        UnOp::Not => ty.is_bool().then_some(Type::Bool),
        UnOp::Neg => match ty {
            Type::U32 => Some(Type::I64),
            Type::U64 => None,
            _ => unary_promote(ty),
        },
        UnOp::BitNot => unary_promote(ty).filter(|t| !t.is_float()),
        _ => ty.is_numeric().then(|| ty.clone()),
    }
}

fn convert(value: &Value, ty: &Type, op: BinOp) -> EvalResult<Value> {
    value
        .cast(ty)
        .ok_or_else(|| EvalError::type_mismatch(op.symbol(), &value.type_name()))
}

/// Apply a non-short-circuit binary operator to two known values
pub fn eval_binary(op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if op.is_comparison() {
        return compare(op, left, right).map(Value::Bool);
    }
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                BinOp::BitAnd | BinOp::And => Ok(Value::Bool(*a & *b)),
                BinOp::BitOr | BinOp::Or => Ok(Value::Bool(*a | *b)),
                BinOp::BitXor => Ok(Value::Bool(*a ^ *b)),
                _ => Err(EvalError::type_mismatch(op.symbol(), "bool")),
            };
        }
        (Value::Str(a), b) if op == BinOp::Add => return Ok(Value::Str(format!("{a}{}", plain(b)))),
        (a, Value::Str(b)) if op == BinOp::Add => return Ok(Value::Str(format!("{}{b}", plain(a)))),
        _ => {}
    }

    let operating = operating_type(op, &left.ty(), &right.ty()).ok_or_else(|| {
        EvalError::type_mismatch(
            op.symbol(),
            &format!("{} and {}", left.type_name(), right.type_name()),
        )
    })?;

    if op.is_shift() {
        return shift(op, &convert(left, &operating, op)?, right);
    }

    let l = convert(left, &operating, op)?;
    let r = convert(right, &operating, op)?;

    if operating.is_float() {
        let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
        let result = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Rem => a % b,
            _ => return Err(EvalError::type_mismatch(op.symbol(), &operating.to_string())),
        };
        // f32 operands computed in f64 then narrowed round exactly once
        return Value::from_f64(&operating, result)
            .ok_or_else(|| EvalError::type_mismatch(op.symbol(), &operating.to_string()));
    }

    let (a, b) = match (l.as_i128(), r.as_i128()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(EvalError::type_mismatch(op.symbol(), &operating.to_string())),
    };
    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Rem => {
            if b == 0 {
                return Err(EvalError::division_by_zero());
            }
            if b == -1 && Some(a) == operating.min_value() && operating.is_signed() {
                return Err(EvalError::overflow(op.symbol()));
            }
            if op == BinOp::Div { a / b } else { a % b }
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        _ => return Err(EvalError::type_mismatch(op.symbol(), &operating.to_string())),
    };
    Value::from_i128(&operating, result)
        .ok_or_else(|| EvalError::type_mismatch(op.symbol(), &operating.to_string()))
}

fn plain(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Char(c) => c.to_string(),
        other => other.to_string(),
    }
}

/// Shift an already promoted left operand
fn shift(op: BinOp, left: &Value, count: &Value) -> EvalResult<Value> {
    let ty = left.ty();
    let (Some(width), Some(value), Some(count)) = (ty.bit_width(), left.as_i128(), count.as_i128())
    else {
        return Err(EvalError::type_mismatch(op.symbol(), &left.type_name()));
    };
    let count = (count & (width as i128 - 1)) as u32;
    let result = match op {
        BinOp::Shl => value.wrapping_shl(count),
        // signed values are sign-extended and unsigned values are non-negative,
        // so an arithmetic i128 shift matches both
        _ => value >> count,
    };
    Value::from_i128(&ty, result).ok_or_else(|| EvalError::type_mismatch(op.symbol(), &left.type_name()))
}

/// Evaluate a comparison on two known values
pub fn compare(op: BinOp, left: &Value, right: &Value) -> EvalResult<bool> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) if op.is_equality() => {
            return Ok((a == b) == (op == BinOp::Eq));
        }
        (Value::Str(a), Value::Str(b)) if op.is_equality() => {
            return Ok((a == b) == (op == BinOp::Eq));
        }
        _ => {}
    }
    let operating = promote(&left.ty(), &right.ty()).ok_or_else(|| {
        EvalError::type_mismatch(
            op.symbol(),
            &format!("{} and {}", left.type_name(), right.type_name()),
        )
    })?;
    let l = convert(left, &operating, op)?;
    let r = convert(right, &operating, op)?;
    let ordering = if operating.is_float() {
        let (a, b) = (l.as_f64().unwrap_or_default(), r.as_f64().unwrap_or_default());
        a.partial_cmp(&b)
    } else {
        match (l.as_i128(), r.as_i128()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => return Err(EvalError::type_mismatch(op.symbol(), &operating.to_string())),
        }
    };
    use std::cmp::Ordering::*;
    Ok(match (op, ordering) {
        (BinOp::Ne, None) => true,
        (_, None) => false,
        (BinOp::Eq, Some(o)) => o == Equal,
        (BinOp::Ne, Some(o)) => o != Equal,
        (BinOp::Lt, Some(o)) => o == Less,
        (BinOp::Le, Some(o)) => o != Greater,
        (BinOp::Gt, Some(o)) => o == Greater,
        (BinOp::Ge, Some(o)) => o != Less,
        _ => return Err(EvalError::type_mismatch(op.symbol(), &operating.to_string())),
    })
}

/// Apply a non-mutating unary operator to a known value
pub fn eval_unary(op: UnOp, value: &Value) -> EvalResult<Value> {
    let mismatch = || EvalError::type_mismatch(&op.to_string(), &value.type_name());
    match op {
        UnOp::Not => value.as_bool().map(|b| Value::Bool(!b)).ok_or_else(mismatch),
        UnOp::Neg | UnOp::BitNot => {
            let ty = unary_result_type(op, &value.ty()).ok_or_else(mismatch)?;
            let v = value.cast(&ty).ok_or_else(mismatch)?;
            match (&v, op) {
                (Value::F32(f), UnOp::Neg) => Ok(Value::F32(-f)),
                (Value::F64(f), UnOp::Neg) => Ok(Value::F64(-f)),
                _ => {
                    let n = v.as_i128().ok_or_else(mismatch)?;
                    let result = if op == UnOp::Neg { n.wrapping_neg() } else { !n };
                    Value::from_i128(&ty, result).ok_or_else(mismatch)
                }
            }
        }
        _ => step(op, value),
    }
}

/// Result of applying an increment or decrement; type is preserved
pub fn step(op: UnOp, value: &Value) -> EvalResult<Value> {
    let delta = match op {
        UnOp::PreIncrement | UnOp::PostIncrement => 1,
        UnOp::PreDecrement | UnOp::PostDecrement => -1,
        _ => return Err(EvalError::unsupported(&op.to_string())),
    };
    let ty = value.ty();
    match value {
        Value::F32(f) => Ok(Value::F32(f + delta as f32)),
        Value::F64(f) => Ok(Value::F64(f + delta as f64)),
        other => other
            .as_i128()
            .and_then(|n| Value::from_i128(&ty, n.wrapping_add(delta)))
            .ok_or_else(|| EvalError::type_mismatch(&op.to_string(), &ty.to_string())),
    }
}
