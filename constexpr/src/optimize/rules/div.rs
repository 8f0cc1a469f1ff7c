//! Division rules
//!
//! Integer division truncates toward zero and traps on a zero divisor or
//! on `MIN / -1`; rewrites that could remove or introduce a trap carry a
//! range proof.

use crate::analysis::Interval;
use crate::ast::{BinOp, Node, UnOp};
use crate::interp::Value;
use crate::util;

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{
    int_value, is_constant, is_minus_one, is_one, negated, op_width, operands, promotes_to_op,
    shift_count,
};

pub static RULES: &[Rule] = &[
    Rule::new("div_identity", Domain::Numeric, identity),
    Rule::new("div_minus_one", Domain::SignedOrFloat, minus_one),
    Rule::new("div_power_of_two_to_shift", Domain::Integer, power_of_two_to_shift),
    Rule::new("div_double_negation", Domain::Float, double_negation),
    Rule::new("div_left_negation", Domain::Float, left_negation),
    Rule::new("div_right_negation", Domain::Float, right_negation),
    Rule::new("div_constant_folding", Domain::Integer, constant_folding),
    Rule::new("div_multiply_cancel", Domain::Numeric, multiply_cancel),
    Rule::new("div_to_reciprocal_multiply", Domain::Float, to_reciprocal_multiply),
    Rule::new("div_one_to_reciprocal", Domain::Float, one_to_reciprocal),
];

/// `x / 1 => x`
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    is_one(ctx, ctx.right).then(|| ctx.left.clone())
}

/// `x / -1 => -x`, for integers only when `x` cannot be `MIN`
fn minus_one(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_minus_one(ctx, ctx.right) || !ctx.has_op_type(ctx.left) {
        return None;
    }
    if ctx.is_integer() {
        let min = ctx.op_ty.as_ref()?.min_value()?;
        if ctx.ranges().interval(ctx.left)?.lo <= min {
            return None;
        }
    }
    Some(Node::unary(UnOp::Neg, ctx.left.clone()))
}

/// `x / 2^n => x >> n` for non-negative `x`; otherwise the biased form
/// `(x + ((x >> (w - 1)) & (2^n - 1))) >> n` rounds toward zero
fn power_of_two_to_shift(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let n = util::power_of_two_exponent(int_value(ctx, ctx.right)?)?;
    let width = op_width(ctx)?;
    if n == 0 || n >= width {
        return None;
    }
    if ctx.ranges().non_negative(ctx.left) {
        return Some(Node::binary(BinOp::Shr, ctx.left.clone(), shift_count(n)));
    }
    if !ctx.is_signed() || !ctx.is_pure(ctx.left) || !ctx.has_op_type(ctx.left) {
        return None;
    }
    let x = ctx.left.clone();
    let sign = Node::binary(BinOp::Shr, x.clone(), shift_count(width - 1));
    let bias = Node::binary(BinOp::BitAnd, sign, ctx.number((1i128 << n) - 1)?);
    let adjusted = Node::binary(BinOp::Add, x, bias);
    Some(Node::binary(BinOp::Shr, adjusted, shift_count(n)))
}

/// `(-x) / (-y) => x / y`
fn double_negation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let x = negated(ctx.left)?;
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(x) || !ctx.has_op_type(y) {
        return None;
    }
    Some(Node::binary(BinOp::Div, x.clone(), y.clone()))
}

/// `(-x) / y => -(x / y)`
fn left_negation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let x = negated(ctx.left)?;
    if !ctx.has_op_type(x) || !ctx.has_op_type(ctx.right) {
        return None;
    }
    let quotient = Node::binary(BinOp::Div, x.clone(), ctx.right.clone());
    Some(Node::unary(UnOp::Neg, quotient))
}

/// `x / (-y) => -(x / y)`
fn right_negation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(y) || !ctx.has_op_type(ctx.left) {
        return None;
    }
    let quotient = Node::binary(BinOp::Div, ctx.left.clone(), y.clone());
    Some(Node::unary(UnOp::Neg, quotient))
}

/// `(x / C1) / C2 => x / (C1 * C2)` for positive constants whose product
/// fits the type
fn constant_folding(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (x, inner) = operands(ctx.left, BinOp::Div)?;
    if !ctx.has_op_type(ctx.left) || is_constant(ctx, x) {
        return None;
    }
    let c1 = int_value(ctx, inner)?;
    let c2 = int_value(ctx, ctx.right)?;
    let product = c1.checked_mul(c2)?;
    let ty = ctx.op_ty.as_ref()?;
    if c1 <= 0 || c2 <= 0 || !ty.contains(product) {
        return None;
    }
    Some(Node::binary(BinOp::Div, x.clone(), ctx.number(product)?))
}

/// `(x * C) / C => x`. Integers need a proof that `x * C` does not wrap.
fn multiply_cancel(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let divisor = ctx.typed_constant(ctx.right)?;
    if divisor.is_zero() || !ctx.has_op_type(ctx.left) {
        return None;
    }
    let (a, b) = operands(ctx.left, BinOp::Mul)?;
    let x = if ctx.typed_constant(b).as_ref() == Some(&divisor) {
        a
    } else if ctx.typed_constant(a).as_ref() == Some(&divisor) {
        b
    } else {
        return None;
    };
    if ctx.is_float() {
        return ctx.fast_math().then(|| x.clone());
    }
    let c = divisor.as_i128()?;
    let ty = ctx.op_ty.as_ref()?;
    let range = ctx.ranges().interval(x)?;
    let corners = [range.lo.checked_mul(c)?, range.hi.checked_mul(c)?];
    let product = Interval::new(corners[0].min(corners[1]), corners[0].max(corners[1]));
    product.fits(ty).then(|| x.clone())
}

/// `x / C => x * (1 / C)` when the reciprocal is exact, or for any finite
/// non-zero `C` under fast-math
fn to_reciprocal_multiply(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let ty = ctx.op_ty.clone()?;
    let c = ctx.typed_constant(ctx.right)?.as_f64()?;
    let single = ty == crate::ast::Type::F32;
    let reciprocal = match util::exact_reciprocal(c, single) {
        Some(r) => r,
        None if ctx.fast_math() && c.is_finite() && c != 0.0 => 1.0 / c,
        None => return None,
    };
    let literal = Node::literal(Value::from_f64(&ty, reciprocal)?);
    Some(Node::binary(BinOp::Mul, ctx.left.clone(), literal))
}

/// `1 / x => reciprocal_estimate(x)` under fast-math
fn one_to_reciprocal(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.fast_math() || !is_one(ctx, ctx.left) || !promotes_to_op(ctx, ctx.right) {
        return None;
    }
    let ty = ctx.op_ty.clone()?;
    ctx.capability_call(&ty, "reciprocal_estimate", vec![ctx.right.clone()], ty.clone())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::ast::Type;
    use crate::config::{FloatMode, OptimizerOptions};
    use crate::interp::{Environment, VariableItem};

    fn x() -> Node {
        var("x", Type::I32)
    }

    const SAMPLES: [Value; 6] = [
        Value::I32(i32::MIN),
        Value::I32(-9),
        Value::I32(-8),
        Value::I32(-1),
        Value::I32(7),
        Value::I32(i32::MAX),
    ];

    #[test]
    fn test_identity() {
        let env = unknowns(&[("x", Type::I32)]);
        assert_eq!(rendered(BinOp::Div, x(), i32_lit(1), &env).as_deref(), Some("x"));
    }

    #[test]
    fn test_minus_one_needs_range_proof() {
        let env = unknowns(&[("x", Type::I32)]);
        assert_eq!(rewrite(BinOp::Div, &x(), &i32_lit(-1), &env), None);

        let mut bounded = Environment::new();
        bounded.declare(
            "x",
            VariableItem::unknown(Type::I32).with_bounds(Some(Value::I32(-100)), None),
        );
        assert_eq!(
            rendered(BinOp::Div, x(), i32_lit(-1), &bounded).as_deref(),
            Some("-x")
        );
    }

    #[test]
    fn test_power_of_two_signed_bias() {
        let env = unknowns(&[("x", Type::I32)]);
        let original = Node::binary(BinOp::Div, x(), i32_lit(4));
        let (_, node) = rewrite(BinOp::Div, &x(), &i32_lit(4), &env).unwrap();
        assert_eq!(node.to_string(), "(x + ((x >> 31) & 3)) >> 2");
        assert_equivalent(&original, &node, &env, "x", &SAMPLES);
    }

    #[test]
    fn test_power_of_two_unsigned_shift() {
        let env = unknowns(&[("u", Type::U32)]);
        let eight = Node::literal(Value::U32(8));
        assert_eq!(
            rendered(BinOp::Div, var("u", Type::U32), eight, &env).as_deref(),
            Some("u >> 3")
        );
    }

    #[test]
    fn test_nested_constants() {
        let env = unknowns(&[("x", Type::I32)]);
        let inner = Node::binary(BinOp::Div, x(), i32_lit(3));
        let original = Node::binary(BinOp::Div, inner.clone(), i32_lit(5));
        let (_, node) = rewrite(BinOp::Div, &inner, &i32_lit(5), &env).unwrap();
        assert_eq!(node.to_string(), "x / 15");
        assert_equivalent(&original, &node, &env, "x", &SAMPLES);
    }

    #[test]
    fn test_multiply_cancel_requires_no_overflow() {
        let env = unknowns(&[("x", Type::I32)]);
        let product = Node::binary(BinOp::Mul, x(), i32_lit(3));
        assert_eq!(rewrite(BinOp::Div, &product, &i32_lit(3), &env), None);

        let small = unknowns(&[("x", Type::I16)]);
        let product = Node::binary(BinOp::Mul, var("x", Type::I16), i32_lit(3));
        let (name, node) = rewrite(BinOp::Div, &product, &i32_lit(3), &small).unwrap();
        assert_eq!(name, "div_multiply_cancel");
        assert_eq!(node.to_string(), "(i32)x");
    }

    #[test]
    fn test_float_reciprocal() {
        let env = unknowns(&[("f", Type::F64)]);
        let f = var("f", Type::F64);
        let four = Node::literal(Value::F64(4.0));
        let three = Node::literal(Value::F64(3.0));
        assert_eq!(rendered(BinOp::Div, f.clone(), four, &env).as_deref(), Some("f * 0.25"));
        assert_eq!(rewrite(BinOp::Div, &f, &three, &env), None);
        let fast = OptimizerOptions {
            float_mode: FloatMode::FastMath,
            ..OptimizerOptions::default()
        };
        let (name, _) = rewrite_with(BinOp::Div, &f, &three, &env, &fast).unwrap();
        assert_eq!(name, "div_to_reciprocal_multiply");
        let one = Node::literal(Value::F64(1.0));
        let (_, node) = rewrite_with(BinOp::Div, &one, &f, &env, &fast).unwrap();
        assert_eq!(node.to_string(), "f64::reciprocal_estimate(f)");
    }

    #[test]
    fn test_float_negations() {
        let env = unknowns(&[("a", Type::F64), ("b", Type::F64)]);
        let na = Node::unary(UnOp::Neg, var("a", Type::F64));
        let nb = Node::unary(UnOp::Neg, var("b", Type::F64));
        assert_eq!(
            rendered(BinOp::Div, na.clone(), nb, &env).as_deref(),
            Some("a / b")
        );
        assert_eq!(
            rendered(BinOp::Div, na, var("b", Type::F64), &env).as_deref(),
            Some("-(a / b)")
        );
    }
}
