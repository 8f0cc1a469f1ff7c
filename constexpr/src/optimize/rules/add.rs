//! Addition rules

use crate::ast::{BinOp, Node, UnOp};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{Side, is_constant, is_positive_zero, is_zero, negated, operands, shift_count, split_constant};

pub static RULES: &[Rule] = &[
    Rule::symmetric("add_identity", Domain::Numeric, identity),
    Rule::symmetric("add_constant_folding", Domain::Numeric, constant_folding),
    Rule::symmetric("add_negation_cancel", Domain::Integer, negation_cancel),
    Rule::symmetric("add_subtraction_cancel", Domain::Integer, subtraction_cancel),
    Rule::new("add_self_to_shift", Domain::Integer, self_to_shift),
    Rule::new("add_double_negated", Domain::Numeric, double_negated),
    Rule::symmetric("add_negated_operand", Domain::Numeric, negated_operand),
    Rule::symmetric("add_fused_multiply_add", Domain::Float, fused_multiply_add),
];

/// `x + 0 => x`. For floats only `x + (-0.0)` is exact; `x + 0.0` turns
/// `-0.0` into `+0.0`.
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_zero(ctx, ctx.right) {
        return None;
    }
    let exact = ctx.is_integer() || !is_positive_zero(ctx, ctx.right) || ctx.fast_math();
    exact.then(|| ctx.left.clone())
}

/// `(x + C1) + C2 => x + (C1 + C2)` and the subtraction variants
fn constant_folding(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.reassociable() || is_constant(ctx, ctx.left) {
        return None;
    }
    let c2 = ctx.typed_constant(ctx.right)?;
    if let Some((x, c1, _)) = split_constant(ctx, ctx.left, BinOp::Add) {
        let sum = ctx.fold(BinOp::Add, &c1, &c2)?;
        return Some(Node::binary(BinOp::Add, x.clone(), Node::literal(sum)));
    }
    match split_constant(ctx, ctx.left, BinOp::Sub)? {
        // (x - C1) + C2 => x + (C2 - C1)
        (x, c1, Side::Right) => {
            let k = ctx.fold(BinOp::Sub, &c2, &c1)?;
            Some(Node::binary(BinOp::Add, x.clone(), Node::literal(k)))
        }
        // (C1 - x) + C2 => (C1 + C2) - x
        (x, c1, Side::Left) => {
            let k = ctx.fold(BinOp::Add, &c1, &c2)?;
            Some(Node::binary(BinOp::Sub, Node::literal(k), x.clone()))
        }
    }
}

/// `x + (-x) => 0`
fn negation_cancel(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let inner = negated(ctx.right)?;
    if ctx.same_value(ctx.left, inner) {
        return ctx.zero();
    }
    None
}

/// `(x - a) + a => x`
fn subtraction_cancel(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (x, a) = operands(ctx.left, BinOp::Sub)?;
    if ctx.has_op_type(ctx.left) && ctx.same_value(a, ctx.right) {
        return Some(x.clone());
    }
    None
}

/// `x + x => x << 1`
fn self_to_shift(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.same_value(ctx.left, ctx.right) || !super::promotes_to_op(ctx, ctx.left) {
        return None;
    }
    Some(Node::binary(BinOp::Shl, ctx.left.clone(), shift_count(1)))
}

/// `(-x) + (-y) => -(x + y)`
///
/// Signed zeros make this inexact for floats: `-0.0 + 0.0` is `+0.0`
/// while `-(0.0 + -0.0)` is `-0.0`.
fn double_negated(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.reassociable() {
        return None;
    }
    let x = negated(ctx.left)?;
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(x) || !ctx.has_op_type(y) {
        return None;
    }
    let sum = Node::binary(BinOp::Add, x.clone(), y.clone());
    Some(Node::unary(UnOp::Neg, sum))
}

/// `x + (-y) => x - y`
fn negated_operand(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(y) {
        return None;
    }
    Some(Node::binary(BinOp::Sub, ctx.left.clone(), y.clone()))
}

/// `(a * b) + c => fma(a, b, c)`, falling back to the multiply-add
/// estimate when the type has no fused form
fn fused_multiply_add(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.fast_math() {
        return None;
    }
    let (a, b) = operands(ctx.left, BinOp::Mul)?;
    let ty = ctx.op_ty.clone()?;
    let pure = ctx.is_pure(a) && ctx.is_pure(b) && ctx.is_pure(ctx.right);
    if !pure || !ctx.has_op_type(ctx.left) {
        return None;
    }
    let args = vec![a.clone(), b.clone(), ctx.right.clone()];
    ctx.capability_call(&ty, "fused_multiply_add", args.clone(), ty.clone())
        .or_else(|| ctx.capability_call(&ty, "multiply_add_estimate", args, ty.clone()))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::ast::Type;
    use crate::config::{FloatMode, OptimizerOptions};
    use crate::host::HostLibrary;
    use crate::interp::Value;

    #[test]
    fn test_identity_both_sides() {
        let env = unknowns(&[("x", Type::I32)]);
        let x = var("x", Type::I32);
        assert_eq!(rendered(BinOp::Add, x.clone(), i32_lit(0), &env).as_deref(), Some("x"));
        assert_eq!(rendered(BinOp::Add, i32_lit(0), x, &env).as_deref(), Some("x"));
    }

    #[test]
    fn test_float_positive_zero_needs_fast_math() {
        let env = unknowns(&[("f", Type::F64)]);
        let f = var("f", Type::F64);
        let pos = Node::literal(Value::F64(0.0));
        let neg = Node::literal(Value::F64(-0.0));
        assert_eq!(rewrite(BinOp::Add, &f, &pos, &env), None);
        assert_eq!(rendered(BinOp::Add, f.clone(), neg, &env).as_deref(), Some("f"));
        let fast = OptimizerOptions {
            float_mode: FloatMode::FastMath,
            ..OptimizerOptions::default()
        };
        let (name, _) = rewrite_with(BinOp::Add, &f, &pos, &env, &fast).unwrap();
        assert_eq!(name, "add_identity");
    }

    #[test]
    fn test_constant_folding_variants() {
        let env = unknowns(&[("x", Type::I32)]);
        let x = var("x", Type::I32);
        let inner = Node::binary(BinOp::Add, x.clone(), i32_lit(3));
        assert_eq!(
            rendered(BinOp::Add, inner, i32_lit(4), &env).as_deref(),
            Some("x + 7")
        );
        let inner = Node::binary(BinOp::Sub, x.clone(), i32_lit(3));
        assert_eq!(
            rendered(BinOp::Add, i32_lit(10), inner, &env).as_deref(),
            Some("x + 7")
        );
        let inner = Node::binary(BinOp::Sub, i32_lit(3), x);
        assert_eq!(
            rendered(BinOp::Add, inner, i32_lit(4), &env).as_deref(),
            Some("7 - x")
        );
    }

    #[test]
    fn test_constant_folding_requires_matching_width() {
        // (x + 1) wraps in i32 before widening, so it must not merge with 1L
        let env = unknowns(&[("x", Type::I32)]);
        let inner = Node::binary(BinOp::Add, var("x", Type::I32), i32_lit(1));
        let outer = Node::literal(Value::I64(1));
        assert_eq!(rewrite(BinOp::Add, &inner, &outer, &env), None);
    }

    #[test]
    fn test_cancellations() {
        let env = unknowns(&[("x", Type::I32), ("a", Type::I32)]);
        let x = var("x", Type::I32);
        let a = var("a", Type::I32);
        let neg = Node::unary(UnOp::Neg, x.clone());
        assert_eq!(rendered(BinOp::Add, neg, x.clone(), &env).as_deref(), Some("0"));
        let diff = Node::binary(BinOp::Sub, x.clone(), a.clone());
        let original = Node::binary(BinOp::Add, diff.clone(), a.clone());
        let (_, rewritten) = rewrite(BinOp::Add, &diff, &a, &env).unwrap();
        assert_eq!(rewritten, x);
        assert_equivalent(
            &original,
            &rewritten,
            &env.clone().with_value("a", Value::I32(i32::MAX)),
            "x",
            &[Value::I32(i32::MIN), Value::I32(-1), Value::I32(7)],
        );
    }

    #[test]
    fn test_impure_operand_blocks_cancellation() {
        let env = unknowns(&[("x", Type::I32)]);
        let call = Node::call("next", vec![], Some(Type::I32));
        let neg = Node::unary(UnOp::Neg, call.clone());
        let result = rewrite(BinOp::Add, &call, &neg, &env);
        assert_ne!(result.map(|(name, _)| name), Some("add_negation_cancel"));
    }

    #[test]
    fn test_self_to_shift_on_narrow_operand() {
        let env = unknowns(&[("b", Type::U8)]);
        let b = var("b", Type::U8);
        let original = Node::binary(BinOp::Add, b.clone(), b.clone());
        let (name, rewritten) = rewrite(BinOp::Add, &b, &b, &env).unwrap();
        assert_eq!(name, "add_self_to_shift");
        assert_eq!(rewritten.to_string(), "b << 1");
        assert_equivalent(&original, &rewritten, &env, "b", &[Value::U8(0), Value::U8(200)]);
    }

    #[test]
    fn test_negated_operand_becomes_subtraction() {
        let env = unknowns(&[("x", Type::I64), ("y", Type::I64)]);
        let y = Node::unary(UnOp::Neg, var("y", Type::I64));
        assert_eq!(
            rendered(BinOp::Add, var("x", Type::I64), y, &env).as_deref(),
            Some("x - y")
        );
    }

    #[test]
    fn test_negated_unsigned_operand_is_left_alone() {
        // -y widens u32 to i64, but x - y would wrap in u32
        let env = unknowns(&[("x", Type::U32), ("y", Type::U32)]);
        let y = Node::unary(UnOp::Neg, var("y", Type::U32));
        let result = rewrite(BinOp::Add, &var("x", Type::U32), &y, &env);
        assert_ne!(result.map(|(name, _)| name), Some("add_negated_operand"));
    }

    #[test]
    fn test_fused_multiply_add_capability() {
        let env = unknowns(&[("a", Type::F64), ("b", Type::F64), ("c", Type::F64)]);
        let product = Node::binary(BinOp::Mul, var("a", Type::F64), var("b", Type::F64));
        let c = var("c", Type::F64);
        assert_eq!(rewrite(BinOp::Add, &product, &c, &env), None);

        let fast = OptimizerOptions {
            float_mode: FloatMode::FastMath,
            ..OptimizerOptions::default()
        };
        let (_, node) = rewrite_with(BinOp::Add, &c, &product, &env, &fast).unwrap();
        assert_eq!(node.to_string(), "f64::fused_multiply_add(a, b, c)");

        let host = HostLibrary::standard().without("fused_multiply_add");
        let ctx = OptimizeContext::new(BinOp::Add, &product, &c, &env, &host, &fast);
        let node = fused_multiply_add(&ctx).unwrap();
        assert_eq!(node.to_string(), "f64::multiply_add_estimate(a, b, c)");
    }
}
