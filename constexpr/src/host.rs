//! Capabilities the engine consumes from its host
//!
//! The engine never resolves symbols itself. It asks a [`TypeOracle`] what a
//! type can do before emitting a call to it, and hands concrete invocations
//! to a [`MethodExecutor`]. [`HostLibrary`] is the built-in host: a table of
//! numeric and string members that it also knows how to execute, so trees
//! rewritten to use those members remain evaluable.

use std::collections::HashSet;

use crate::ast::{Type, TypeCategory};
use crate::interp::{Value, numeric};

/// Answers questions about semantic types
pub trait TypeOracle {
    fn category(&self, ty: &Type) -> TypeCategory {
        ty.category()
    }

    /// Does `ty` expose a static member `name` taking `arity` arguments
    fn has_member(&self, ty: &Type, name: &str, arity: usize) -> bool;
}

/// Resolved target of an invocation
#[derive(Debug, Clone, Copy)]
pub enum CallTarget<'a> {
    Function(&'a str),
    Static(&'a Type, &'a str),
    Method(&'a str),
}

/// Executes host routines on concrete values
pub trait MethodExecutor {
    /// `None` when the target is unknown or execution fails
    fn invoke(&self, target: CallTarget<'_>, receiver: Option<&Value>, args: &[Value])
    -> Option<Value>;

    /// Read a property such as `length`
    fn member(&self, receiver: &Value, name: &str) -> Option<Value>;
}

/// Everything the engine needs from its host
pub trait Host: TypeOracle + MethodExecutor {}

impl<T: TypeOracle + MethodExecutor + ?Sized> Host for T {}

const SIGNED_MEMBERS: &[(&str, usize)] = &[
    ("is_even", 1),
    ("is_odd", 1),
    ("min", 2),
    ("max", 2),
    ("clamp", 3),
    ("abs", 1),
    ("is_negative", 1),
    ("is_positive", 1),
];

const UNSIGNED_MEMBERS: &[(&str, usize)] = &[
    ("is_even", 1),
    ("is_odd", 1),
    ("min", 2),
    ("max", 2),
    ("clamp", 3),
    ("is_positive", 1),
];

const FLOAT_MEMBERS: &[(&str, usize)] = &[
    ("fused_multiply_add", 3),
    ("multiply_add_estimate", 3),
    ("reciprocal_estimate", 1),
    ("sqrt", 1),
    ("abs", 1),
    ("min", 2),
    ("max", 2),
    ("clamp", 3),
    ("is_negative", 1),
    ("is_positive", 1),
    ("is_nan", 1),
];

/// Built-in host library
#[derive(Debug, Clone, Default)]
pub struct HostLibrary {
    disabled: HashSet<String>,
}

impl HostLibrary {
    pub fn standard() -> Self {
        Self::default()
    }

    /// Same library with one member removed from every type
    pub fn without(mut self, member: &str) -> Self {
        self.disabled.insert(member.to_string());
        self
    }

    fn members(category: TypeCategory) -> &'static [(&'static str, usize)] {
        match category {
            TypeCategory::SignedInteger => SIGNED_MEMBERS,
            TypeCategory::UnsignedInteger => UNSIGNED_MEMBERS,
            TypeCategory::FloatingPoint => FLOAT_MEMBERS,
            _ => &[],
        }
    }

    fn call_static(&self, ty: &Type, name: &str, args: &[Value]) -> Option<Value> {
        if !self.has_member(ty, name, args.len()) {
            return None;
        }
        let args = args
            .iter()
            .map(|a| a.cast(ty))
            .collect::<Option<Vec<_>>>()?;
        if ty.is_float() {
            let f: Vec<f64> = args.iter().filter_map(Value::as_f64).collect();
            let out = match (name, f.as_slice()) {
                ("fused_multiply_add", [a, b, c]) => fused(ty, *a, *b, *c),
                ("multiply_add_estimate", [a, b, c]) => {
                    let product = Value::from_f64(ty, a * b)?.as_f64()?;
                    product + c
                }
                ("reciprocal_estimate", [a]) => 1.0 / a,
                ("sqrt", [a]) => a.sqrt(),
                ("abs", [a]) => a.abs(),
                ("min", [a, b]) => float_min(*a, *b),
                ("max", [a, b]) => -float_min(-a, -b),
                ("clamp", [v, lo, hi]) if lo <= hi => float_min(-float_min(-v, -lo), *hi),
                ("is_negative", [a]) => return Some(Value::Bool(a.is_sign_negative())),
                ("is_positive", [a]) => return Some(Value::Bool(a.is_sign_positive())),
                ("is_nan", [a]) => return Some(Value::Bool(a.is_nan())),
                _ => return None,
            };
            return Value::from_f64(ty, out);
        }
        let n: Vec<i128> = args.iter().filter_map(Value::as_i128).collect();
        let out = match (name, n.as_slice()) {
            ("is_even", [a]) => return Some(Value::Bool(a % 2 == 0)),
            ("is_odd", [a]) => return Some(Value::Bool(a % 2 != 0)),
            ("is_negative", [a]) => return Some(Value::Bool(*a < 0)),
            ("is_positive", [a]) => return Some(Value::Bool(*a >= 0)),
            ("min", [a, b]) => *a.min(b),
            ("max", [a, b]) => *a.max(b),
            ("clamp", [v, lo, hi]) if lo <= hi => *v.max(lo).min(hi),
            ("abs", [a]) if Some(*a) != ty.min_value() => a.abs(),
            _ => return None,
        };
        Value::from_i128(ty, out)
    }
}

fn fused(ty: &Type, a: f64, b: f64, c: f64) -> f64 {
    if *ty == Type::F32 {
        (a as f32).mul_add(b as f32, c as f32) as f64
    } else {
        a.mul_add(b, c)
    }
}

/// Minimum that propagates NaN and orders -0.0 below +0.0
fn float_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a < b {
        a
    } else if b < a {
        b
    } else if a.is_sign_negative() {
        a
    } else {
        b
    }
}

impl TypeOracle for HostLibrary {
    fn has_member(&self, ty: &Type, name: &str, arity: usize) -> bool {
        !self.disabled.contains(name)
            && Self::members(self.category(ty))
                .iter()
                .any(|(member, n)| *member == name && *n == arity)
    }
}

impl MethodExecutor for HostLibrary {
    fn invoke(
        &self,
        target: CallTarget<'_>,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Option<Value> {
        match target {
            CallTarget::Static(ty, name) => self.call_static(ty, name, args),
            CallTarget::Function(name) => {
                // free numeric helpers dispatch on the promoted argument type
                let ty = args
                    .iter()
                    .map(Value::ty)
                    .try_fold(None::<Type>, |acc, t| match acc {
                        None => Some(Some(t)),
                        Some(prev) => numeric::promote(&prev, &t).map(Some),
                    })??;
                let ty = numeric::unary_promote(&ty)?;
                self.call_static(&ty, name, args)
            }
            CallTarget::Method(name) => match (receiver?, name, args) {
                (Value::Str(s), "contains", [Value::Str(needle)]) => {
                    Some(Value::Bool(s.contains(needle.as_str())))
                }
                (Value::Str(s), "starts_with", [Value::Str(p)]) => {
                    Some(Value::Bool(s.starts_with(p.as_str())))
                }
                (Value::Str(s), "ends_with", [Value::Str(p)]) => {
                    Some(Value::Bool(s.ends_with(p.as_str())))
                }
                (Value::Str(s), "to_upper", []) => Some(Value::Str(s.to_uppercase())),
                (Value::Str(s), "to_lower", []) => Some(Value::Str(s.to_lowercase())),
                (Value::Array(items), "contains", [needle]) => {
                    Some(Value::Bool(items.iter().any(|item| {
                        numeric::compare(crate::ast::BinOp::Eq, item, needle).unwrap_or(false)
                    })))
                }
                (recv, "len", []) => self.member(recv, "length"),
                _ => None,
            },
        }
    }

    fn member(&self, receiver: &Value, name: &str) -> Option<Value> {
        match (receiver, name) {
            (Value::Str(s), "length") => Some(Value::I32(s.encode_utf16().count() as i32)),
            (Value::Array(items), "length") => Some(Value::I32(items.len() as i32)),
            _ => None,
        }
    }
}
