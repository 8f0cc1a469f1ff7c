//! Bitwise and rules, for integers and non-short-circuit booleans

use crate::ast::{BinOp, Node};
use crate::util;

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{
    int_value, inverted, is_all_ones_or_true, is_zero_or_false, operands, split_constant,
    zero_or_false,
};

pub static RULES: &[Rule] = &[
    Rule::symmetric("bitand_zero", Domain::IntegerOrBoolean, zero),
    Rule::symmetric("bitand_identity", Domain::IntegerOrBoolean, identity),
    Rule::symmetric("bitand_mask_covers_range", Domain::Integer, mask_covers_range),
    Rule::new("bitand_idempotent", Domain::IntegerOrBoolean, idempotent),
    Rule::symmetric("bitand_absorption", Domain::IntegerOrBoolean, absorption),
    Rule::symmetric("bitand_combine_masks", Domain::Integer, combine_masks),
    Rule::symmetric("bitand_or_collision", Domain::Integer, or_collision),
    Rule::symmetric("bitand_or_disjoint", Domain::Integer, or_disjoint),
    Rule::symmetric("bitand_complement", Domain::IntegerOrBoolean, complement),
];

/// `x & 0 => 0`, `b & false => false`
fn zero(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_zero_or_false(ctx, ctx.right) || !ctx.is_pure(ctx.left) {
        return None;
    }
    zero_or_false(ctx)
}

/// `x & ~0 => x`, `b & true => b`
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    is_all_ones_or_true(ctx, ctx.right).then(|| ctx.left.clone())
}

/// `x & (2^k - 1) => x` when `x` is known to lie in `[0, 2^k - 1]`
fn mask_covers_range(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let mask = int_value(ctx, ctx.right)?;
    if mask < 0 || !util::is_power_of_two(mask + 1) {
        return None;
    }
    let range = ctx.ranges().interval(ctx.left)?;
    (range.lo >= 0 && range.hi <= mask).then(|| ctx.left.clone())
}

/// `x & x => x`
fn idempotent(ctx: &OptimizeContext<'_>) -> Option<Node> {
    ctx.same_value(ctx.left, ctx.right).then(|| ctx.left.clone())
}

/// `x & (x | y) => x`
fn absorption(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (a, b) = operands(ctx.right, BinOp::BitOr)?;
    let absorbed = (ctx.same_value(ctx.left, a) && ctx.is_pure(b))
        || (ctx.same_value(ctx.left, b) && ctx.is_pure(a));
    absorbed.then(|| ctx.left.clone())
}

/// `(x & C1) & C2 => x & (C1 & C2)`
fn combine_masks(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = ctx.typed_constant(ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::BitAnd)?;
    let mask = ctx.fold(BinOp::BitAnd, &c1, &c2)?;
    Some(Node::binary(BinOp::BitAnd, x.clone(), Node::literal(mask)))
}

/// `(x | C1) & C2 => C2` when every bit of `C2` is set in `C1`
fn or_collision(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = int_value(ctx, ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::BitOr)?;
    let c1 = c1.as_i128()?;
    if c2 & !c1 != 0 || !ctx.is_pure(x) {
        return None;
    }
    Some(ctx.right.clone())
}

/// `(x | C1) & C2 => x & C2` when `C1` and `C2` share no bits
fn or_disjoint(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = int_value(ctx, ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::BitOr)?;
    if c1.as_i128()? & c2 != 0 {
        return None;
    }
    Some(Node::binary(BinOp::BitAnd, x.clone(), ctx.right.clone()))
}

/// `x & ~x => 0`, `b & !b => false`
fn complement(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let inner = inverted(ctx, ctx.right)?;
    if !ctx.same_value(ctx.left, inner) {
        return None;
    }
    zero_or_false(ctx)
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::ast::{Type, UnOp};
    use crate::interp::Value;

    fn x() -> Node {
        var("x", Type::I32)
    }

    const SAMPLES: [Value; 4] = [
        Value::I32(i32::MIN),
        Value::I32(-6),
        Value::I32(0x5A5A),
        Value::I32(i32::MAX),
    ];

    #[test]
    fn test_constants() {
        let env = unknowns(&[("x", Type::I32), ("b", Type::Bool)]);
        let b = var("b", Type::Bool);
        assert_eq!(rendered(BinOp::BitAnd, i32_lit(0), x(), &env).as_deref(), Some("0"));
        assert_eq!(rendered(BinOp::BitAnd, x(), i32_lit(-1), &env).as_deref(), Some("x"));
        assert_eq!(
            rendered(BinOp::BitAnd, b.clone(), Node::bool(false), &env).as_deref(),
            Some("false")
        );
        assert_eq!(
            rendered(BinOp::BitAnd, Node::bool(true), b, &env).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_zero_keeps_impure_operand() {
        let env = unknowns(&[]);
        let call = Node::call("next", vec![], Some(Type::I32));
        assert_eq!(rewrite(BinOp::BitAnd, &call, &i32_lit(0), &env), None);
    }

    #[test]
    fn test_mask_covering_type_range() {
        let env = unknowns(&[("b", Type::U8)]);
        let (name, node) =
            rewrite(BinOp::BitAnd, &var("b", Type::U8), &i32_lit(255), &env).unwrap();
        assert_eq!(name, "bitand_mask_covers_range");
        assert_eq!(node.to_string(), "(i32)b");
        assert_eq!(
            rewrite(BinOp::BitAnd, &var("b", Type::U8), &i32_lit(127), &env),
            None
        );
    }

    #[test]
    fn test_idempotent_and_absorption() {
        let env = unknowns(&[("x", Type::I32), ("y", Type::I32)]);
        assert_eq!(rendered(BinOp::BitAnd, x(), x(), &env).as_deref(), Some("x"));
        let or = Node::binary(BinOp::BitOr, var("y", Type::I32), x());
        assert_eq!(rendered(BinOp::BitAnd, or, x(), &env).as_deref(), Some("x"));
    }

    #[test]
    fn test_constant_masks() {
        let env = unknowns(&[("x", Type::I32)]);
        let inner = Node::binary(BinOp::BitAnd, x(), i32_lit(0xF0));
        assert_eq!(
            rendered(BinOp::BitAnd, inner, i32_lit(0x3C), &env).as_deref(),
            Some("x & 48")
        );

        let or = Node::binary(BinOp::BitOr, x(), i32_lit(12));
        let (name, node) = rewrite(BinOp::BitAnd, &or, &i32_lit(4), &env).unwrap();
        assert_eq!(name, "bitand_or_collision");
        assert_eq!(node.to_string(), "4");

        let original = Node::binary(BinOp::BitAnd, or.clone(), i32_lit(3));
        let (name, node) = rewrite(BinOp::BitAnd, &or, &i32_lit(3), &env).unwrap();
        assert_eq!(name, "bitand_or_disjoint");
        assert_eq!(node.to_string(), "x & 3");
        assert_equivalent(&original, &node, &env, "x", &SAMPLES);
    }

    #[test]
    fn test_complement() {
        let env = unknowns(&[("x", Type::I32), ("b", Type::Bool)]);
        let not_x = Node::unary(UnOp::BitNot, x());
        assert_eq!(rendered(BinOp::BitAnd, not_x, x(), &env).as_deref(), Some("0"));
        let b = var("b", Type::Bool);
        assert_eq!(
            rendered(BinOp::BitAnd, b.clone(), Node::not(b), &env).as_deref(),
            Some("false")
        );
    }
}
