//! Bitwise or rules, for integers and non-short-circuit booleans

use crate::ast::{BinOp, Node};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{
    all_ones_or_true, int_value, inverted, is_all_ones_or_true, is_zero_or_false, operands,
    split_constant,
};

pub static RULES: &[Rule] = &[
    Rule::symmetric("bitor_identity", Domain::IntegerOrBoolean, identity),
    Rule::symmetric("bitor_all_ones", Domain::IntegerOrBoolean, all_ones),
    Rule::new("bitor_idempotent", Domain::IntegerOrBoolean, idempotent),
    Rule::symmetric("bitor_absorption", Domain::IntegerOrBoolean, absorption),
    Rule::symmetric("bitor_combine", Domain::Integer, combine),
    Rule::symmetric("bitor_and_mask_absorption", Domain::Integer, and_mask_absorption),
    Rule::symmetric("bitor_complement", Domain::IntegerOrBoolean, complement),
];

/// `x | 0 => x`, `b | false => b`
fn identity(ctx: &OptimizeContext<'_>) -> Option<Node> {
    is_zero_or_false(ctx, ctx.right).then(|| ctx.left.clone())
}

/// `x | ~0 => ~0`, `b | true => true`
fn all_ones(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_all_ones_or_true(ctx, ctx.right) || !ctx.is_pure(ctx.left) {
        return None;
    }
    all_ones_or_true(ctx)
}

/// `x | x => x`
fn idempotent(ctx: &OptimizeContext<'_>) -> Option<Node> {
    ctx.same_value(ctx.left, ctx.right).then(|| ctx.left.clone())
}

/// `x | (x & y) => x`
fn absorption(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (a, b) = operands(ctx.right, BinOp::BitAnd)?;
    let absorbed = (ctx.same_value(ctx.left, a) && ctx.is_pure(b))
        || (ctx.same_value(ctx.left, b) && ctx.is_pure(a));
    absorbed.then(|| ctx.left.clone())
}

/// `(x | C1) | C2 => x | (C1 | C2)`
fn combine(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = ctx.typed_constant(ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::BitOr)?;
    let bits = ctx.fold(BinOp::BitOr, &c1, &c2)?;
    Some(Node::binary(BinOp::BitOr, x.clone(), Node::literal(bits)))
}

/// `(x & C1) | C2 => C2` when every bit of `C1` is set in `C2`
fn and_mask_absorption(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = int_value(ctx, ctx.right)?;
    let (x, c1, _) = split_constant(ctx, ctx.left, BinOp::BitAnd)?;
    if c1.as_i128()? & !c2 != 0 || !ctx.is_pure(x) {
        return None;
    }
    Some(ctx.right.clone())
}

/// `x | ~x => ~0`, `b | !b => true`
fn complement(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let inner = inverted(ctx, ctx.right)?;
    if !ctx.same_value(ctx.left, inner) {
        return None;
    }
    all_ones_or_true(ctx)
}
