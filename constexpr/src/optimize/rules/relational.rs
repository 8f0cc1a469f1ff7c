//! Ordering comparison rules: `<`, `<=`, `>`, `>=`

use crate::ast::{BinOp, Node};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{Side, is_constant, is_zero, negated, split_constant};

pub static RULES: &[Rule] = &[
    Rule::new("relational_self", Domain::Any, self_compare),
    Rule::new("relational_range_decide", Domain::Integer, range_decide),
    Rule::new("relational_constant_left", Domain::Numeric, constant_left),
    Rule::new("relational_float_negation", Domain::Float, float_negation),
    Rule::new("relational_non_negative_zero", Domain::Integer, non_negative_zero),
    Rule::new("relational_offset", Domain::Integer, offset),
];

/// `x < x => false`, `x <= x => true` for non-float `x`
fn self_compare(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let floating = ctx.type_of(ctx.left).is_none_or(|t| t.is_float()) || ctx.is_float();
    if floating || !ctx.same_value(ctx.left, ctx.right) {
        return None;
    }
    Some(Node::bool(matches!(ctx.op, BinOp::Le | BinOp::Ge)))
}

fn range_decide(ctx: &OptimizeContext<'_>) -> Option<Node> {
    ctx.ranges()
        .decide(ctx.op, ctx.left, ctx.right)
        .map(Node::bool)
}

/// `C < x => x > C`
fn constant_left(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_constant(ctx, ctx.left) || is_constant(ctx, ctx.right) {
        return None;
    }
    let flipped = ctx.op.flipped()?;
    Some(Node::binary(flipped, ctx.right.clone(), ctx.left.clone()))
}

/// `-x < -y => y < x`; float negation is exact
fn float_negation(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let x = negated(ctx.left)?;
    let y = negated(ctx.right)?;
    if !ctx.has_op_type(ctx.left) || !ctx.has_op_type(ctx.right) {
        return None;
    }
    Some(Node::binary(ctx.op, y.clone(), x.clone()))
}

/// `x > 0 => x != 0`, `x <= 0 => x == 0` for provably non-negative `x`
fn non_negative_zero(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let op = match ctx.op {
        BinOp::Gt => BinOp::Ne,
        BinOp::Le => BinOp::Eq,
        _ => return None,
    };
    if !is_zero(ctx, ctx.right) || !ctx.ranges().non_negative(ctx.left) {
        return None;
    }
    Some(Node::binary(op, ctx.left.clone(), ctx.right.clone()))
}

/// `x + C1 < C2 => x < C2 - C1` when the sum provably does not wrap
fn offset(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let c2 = ctx.int_constant(ctx.right)?;
    let (op, _, _) = ctx.left.as_binary()?;
    let (x, c1, side) = match op {
        BinOp::Add | BinOp::Sub => split_constant(ctx, ctx.left, op)?,
        _ => return None,
    };
    // C1 - x reverses the order
    if side == Side::Left && op == BinOp::Sub {
        return None;
    }
    let c1 = c1.as_i128()?;
    let delta = if op == BinOp::Add { c1 } else { c1.checked_neg()? };
    let ty = ctx.op_ty.as_ref()?;
    let iv = ctx.ranges().interval(x)?;
    let shifted_lo = iv.lo.checked_add(delta)?;
    let shifted_hi = iv.hi.checked_add(delta)?;
    if !ty.contains(shifted_lo) || !ty.contains(shifted_hi) {
        return None;
    }
    let bound = c2.checked_sub(delta)?;
    let bound = ctx.number(bound).filter(|_| ty.contains(bound))?;
    Some(Node::binary(ctx.op, x.clone(), bound))
}
