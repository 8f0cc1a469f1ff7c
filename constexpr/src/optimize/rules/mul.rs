//! Multiplication rules

use crate::ast::{BinOp, Node, UnOp};
use crate::util;

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{
    int_value, is_constant, is_minus_one, is_one, is_zero, negated, op_width, promotes_to_op,
    shift_count, split_constant,
};

pub static RULES: &[Rule] = &[
    Rule::symmetric("mul_zero", Domain::Numeric, zero),
    Rule::symmetric("mul_identity", Domain::Numeric, identity),
    Rule::symmetric("mul_minus_one", Domain::SignedOrFloat, minus_one),
    Rule::symmetric("mul_constant_folding", Domain::Numeric, constant_folding),
    Rule::symmetric("mul_power_of_two_to_shift", Domain::Integer, power_of_two_to_shift),
    Rule::symmetric("mul_by_two_to_addition", Domain::Float, by_two_to_addition),
    Rule::symmetric("mul_strength_reduction", Domain::Integer, strength_reduction),
    Rule::new("mul_double_negation", Domain::Numeric, double_negation),
    Rule::symmetric("mul_negation_hoist", Domain::Numeric, negation_hoist),
];

/// `x * 0 => 0` when `x` can be dropped; floats keep NaN, infinities and
/// the sign of zero, so only under fast-math
fn zero(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_zero(ctx, ctx.right) || !ctx.is_pure(ctx.left) {
        return None;
    }
    if ctx.is_float() && !ctx.fast_math() {
        return None;
    }
    ctx.zero()
}

/// `x * 1 => x`
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    is_one(ctx, ctx.right).then(|| ctx.left.clone())
}

/// `x * -1 => -x`
fn minus_one(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_minus_one(ctx, ctx.right) || !ctx.has_op_type(ctx.left) {
        return None;
    }
    Some(Node::unary(UnOp::Neg, ctx.left.clone()))
}

/// `(x * C1) * C2 => x * (C1 * C2)`
fn constant_folding(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.reassociable() || is_constant(ctx, ctx.left) {
        return None;
    }
    let c2 = ctx.typed_constant(ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::Mul)?;
    let product = ctx.fold(BinOp::Mul, &c1, &c2)?;
    Some(Node::binary(BinOp::Mul, x.clone(), Node::literal(product)))
}

/// `x * 2^n => x << n`
fn power_of_two_to_shift(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let n = util::power_of_two_exponent(int_value(ctx, ctx.right)?)?;
    if n == 0 || n >= op_width(ctx)? || !promotes_to_op(ctx, ctx.left) {
        return None;
    }
    Some(Node::binary(BinOp::Shl, ctx.left.clone(), shift_count(n)))
}

/// `x * 2.0 => x + x`
fn by_two_to_addition(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let two = ctx.typed_constant(ctx.right)?.as_f64()? == 2.0;
    if !two || !ctx.is_pure(ctx.left) || !ctx.has_op_type(ctx.left) {
        return None;
    }
    Some(Node::binary(BinOp::Add, ctx.left.clone(), ctx.left.clone()))
}

/// `x * (2^n + 1) => (x << n) + x` and `x * (2^n - 1) => (x << n) - x`
fn strength_reduction(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (n, plus) = util::adjacent_power_of_two(int_value(ctx, ctx.right)?)?;
    if n >= op_width(ctx)? || !ctx.is_pure(ctx.left) || !promotes_to_op(ctx, ctx.left) {
        return None;
    }
    let shifted = Node::binary(BinOp::Shl, ctx.left.clone(), shift_count(n));
    let op = if plus { BinOp::Add } else { BinOp::Sub };
    Some(Node::binary(op, shifted, ctx.left.clone()))
}

/// `(-x) * (-y) => x * y`
fn double_negation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let x = negated(ctx.left)?;
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(x) || !ctx.has_op_type(y) {
        return None;
    }
    Some(Node::binary(BinOp::Mul, x.clone(), y.clone()))
}

/// `(-x) * y => -(x * y)`
fn negation_hoist(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let x = negated(ctx.left)?;
    if !ctx.has_op_type(x) || !ctx.has_op_type(ctx.right) || negated(ctx.right).is_some() {
        return None;
    }
    let product = Node::binary(BinOp::Mul, x.clone(), ctx.right.clone());
    Some(Node::unary(UnOp::Neg, product))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::ast::Type;
    use crate::interp::Value;

    fn x() -> Node {
        var("x", Type::I32)
    }

    #[test]
    fn test_identity_zero_and_minus_one() {
        let env = unknowns(&[("x", Type::I32)]);
        assert_eq!(rendered(BinOp::Mul, x(), i32_lit(1), &env).as_deref(), Some("x"));
        assert_eq!(rendered(BinOp::Mul, i32_lit(0), x(), &env).as_deref(), Some("0"));
        assert_eq!(rendered(BinOp::Mul, i32_lit(-1), x(), &env).as_deref(), Some("-x"));
    }

    #[test]
    fn test_zero_keeps_impure_operand() {
        let env = unknowns(&[]);
        let call = Node::call("next", vec![], Some(Type::I32));
        assert_eq!(rewrite(BinOp::Mul, &call, &i32_lit(0), &env), None);
    }

    #[test]
    fn test_float_zero_is_strict() {
        let env = unknowns(&[("f", Type::F64)]);
        let zero = Node::literal(Value::F64(0.0));
        assert_eq!(rewrite(BinOp::Mul, &var("f", Type::F64), &zero, &env), None);
    }

    #[test]
    fn test_power_of_two_becomes_shift() {
        let env = unknowns(&[("x", Type::I32)]);
        let original = Node::binary(BinOp::Mul, x(), i32_lit(8));
        let (_, node) = rewrite(BinOp::Mul, &i32_lit(8), &x(), &env).unwrap();
        assert_eq!(node.to_string(), "x << 3");
        assert_equivalent(
            &original,
            &node,
            &env,
            "x",
            &[Value::I32(-5), Value::I32(i32::MAX), Value::I32(1 << 29)],
        );
    }

    #[test]
    fn test_shift_skipped_when_operand_is_narrower_than_operation() {
        // x << 1 would wrap in u32 while x * 2L computes in i64
        let env = unknowns(&[("x", Type::U32)]);
        let two = Node::literal(Value::I64(2));
        let result = rewrite(BinOp::Mul, &var("x", Type::U32), &two, &env);
        assert_ne!(result.map(|(name, _)| name), Some("mul_power_of_two_to_shift"));
    }

    #[test]
    fn test_strength_reduction() {
        let env = unknowns(&[("x", Type::I32)]);
        assert_eq!(
            rendered(BinOp::Mul, i32_lit(5), x(), &env).as_deref(),
            Some("(x << 2) + x")
        );
        let original = Node::binary(BinOp::Mul, x(), i32_lit(7));
        let (_, node) = rewrite(BinOp::Mul, &x(), &i32_lit(7), &env).unwrap();
        assert_eq!(node.to_string(), "(x << 3) - x");
        assert_equivalent(
            &original,
            &node,
            &env,
            "x",
            &[Value::I32(i32::MIN), Value::I32(-9), Value::I32(300_000_000)],
        );
    }

    #[test]
    fn test_strength_reduction_needs_pure_operand() {
        let env = unknowns(&[]);
        let call = Node::call("next", vec![], Some(Type::I32));
        assert_eq!(rewrite(BinOp::Mul, &call, &i32_lit(5), &env), None);
    }

    #[test]
    fn test_constant_folding() {
        let env = unknowns(&[("x", Type::I32)]);
        let inner = Node::binary(BinOp::Mul, i32_lit(3), x());
        assert_eq!(
            rendered(BinOp::Mul, inner, i32_lit(3), &env).as_deref(),
            Some("x * 9")
        );
    }

    #[test]
    fn test_float_times_two() {
        let env = unknowns(&[("f", Type::F32)]);
        let two = Node::literal(Value::F32(2.0));
        assert_eq!(
            rendered(BinOp::Mul, var("f", Type::F32), two, &env).as_deref(),
            Some("f + f")
        );
    }

    #[test]
    fn test_negations() {
        let env = unknowns(&[("x", Type::I32), ("y", Type::I32)]);
        let nx = Node::unary(UnOp::Neg, x());
        let ny = Node::unary(UnOp::Neg, var("y", Type::I32));
        assert_eq!(
            rendered(BinOp::Mul, nx.clone(), ny, &env).as_deref(),
            Some("x * y")
        );
        assert_eq!(
            rendered(BinOp::Mul, var("y", Type::I32), nx, &env).as_deref(),
            Some("-(x * y)")
        );
    }
}
