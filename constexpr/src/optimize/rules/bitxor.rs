//! Exclusive or rules

use crate::ast::{BinOp, Node, UnOp};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{
    all_ones_or_true, inverted, is_all_ones_or_true, is_zero_or_false, operands, promotes_to_op,
    split_constant, zero_or_false,
};

pub static RULES: &[Rule] = &[
    Rule::symmetric("bitxor_identity", Domain::IntegerOrBoolean, identity),
    Rule::symmetric("bitxor_all_ones", Domain::IntegerOrBoolean, all_ones),
    Rule::new("bitxor_self", Domain::IntegerOrBoolean, self_cancel),
    Rule::symmetric("bitxor_cancellation", Domain::IntegerOrBoolean, cancellation),
    Rule::symmetric("bitxor_combine", Domain::Integer, combine),
    Rule::symmetric("bitxor_complement", Domain::IntegerOrBoolean, complement),
];

/// `x ^ 0 => x`, `b ^ false => b`
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    is_zero_or_false(ctx, ctx.right).then(|| ctx.left.clone())
}

/// `x ^ ~0 => ~x`, `b ^ true => !b`
fn all_ones(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_all_ones_or_true(ctx, ctx.right) {
        return None;
    }
    if ctx.is_bool() {
        return Some(Node::not(ctx.left.clone()));
    }
    promotes_to_op(ctx, ctx.left).then(|| Node::unary(UnOp::BitNot, ctx.left.clone()))
}

/// `x ^ x => 0`
fn self_cancel(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.same_value(ctx.left, ctx.right) {
        return None;
    }
    zero_or_false(ctx)
}

/// `(x ^ y) ^ x => y` and `(y ^ x) ^ x => y`
fn cancellation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (a, b) = operands(ctx.left, BinOp::BitXor)?;
    if !ctx.has_op_type(ctx.left) {
        return None;
    }
    if ctx.same_value(a, ctx.right) {
        return Some(b.clone());
    }
    if ctx.same_value(b, ctx.right) {
        return Some(a.clone());
    }
    None
}

/// `(x ^ C1) ^ C2 => x ^ (C1 ^ C2)`
fn combine(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = ctx.typed_constant(ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::BitXor)?;
    let bits = ctx.fold(BinOp::BitXor, &c1, &c2)?;
    Some(Node::binary(BinOp::BitXor, x.clone(), Node::literal(bits)))
}

/// `x ^ ~x => ~0`, `b ^ !b => true`
fn complement(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let inner = inverted(ctx, ctx.right)?;
    if !ctx.same_value(ctx.left, inner) {
        return None;
    }
    all_ones_or_true(ctx)
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
    fn test_identity_and_self() {
        let env = unknowns(&[("x", Type::I32)]);
        assert_eq!(rendered(BinOp::BitXor, x(), i32_lit(0), &env).as_deref(), Some("x"));
        assert_eq!(rendered(BinOp::BitXor, x(), x(), &env).as_deref(), Some("0"));
    }

    #[test]
    fn test_all_ones_becomes_complement() {
        let env = unknowns(&[("x", Type::I32), ("b", Type::Bool), ("w", Type::U8)]);
        assert_eq!(rendered(BinOp::BitXor, i32_lit(-1), x(), &env).as_deref(), Some("~x"));
        assert_eq!(
            rendered(BinOp::BitXor, var("b", Type::Bool), Node::bool(true), &env).as_deref(),
            Some("!b")
        );
        let original = Node::binary(BinOp::BitXor, var("w", Type::U8), i32_lit(-1));
        let (_, node) = rewrite(BinOp::BitXor, &var("w", Type::U8), &i32_lit(-1), &env).unwrap();
        assert_eq!(node.to_string(), "~w");
        assert_equivalent(&original, &node, &env, "w", &[Value::U8(0), Value::U8(0x81)]);
    }

    #[test]
    fn test_cancellation() {
        let env = unknowns(&[("x", Type::I32), ("y", Type::I32)]);
        let y = var("y", Type::I32);
        let inner = Node::binary(BinOp::BitXor, x(), y.clone());
        let (name, node) = rewrite(BinOp::BitXor, &inner, &x(), &env).unwrap();
        assert_eq!(name, "bitxor_cancellation");
        assert_eq!(node, y);
        let (_, node) = rewrite(BinOp::BitXor, &y, &inner, &env).unwrap();
        assert_eq!(node, x());
    }

    #[test]
    fn test_combine() {
        let env = unknowns(&[("x", Type::I32)]);
        let inner = Node::binary(BinOp::BitXor, x(), i32_lit(5));
        assert_eq!(
            rendered(BinOp::BitXor, inner, i32_lit(3), &env).as_deref(),
            Some("x ^ 6")
        );
    }

    #[test]
    fn test_complement() {
        let env = unknowns(&[("x", Type::I32)]);
        let not_x = Node::unary(UnOp::BitNot, x());
        assert_eq!(rendered(BinOp::BitXor, not_x, x(), &env).as_deref(), Some("-1"));
    }
}
