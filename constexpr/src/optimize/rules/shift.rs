//! Shift rules
//!
//! Shifts compute in the unary promotion of the left operand and mask the
//! count to `width - 1`, so counts are compared after masking.

use crate::ast::{BinOp, Node};

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{is_zero, op_width, operands, shift_count};

pub static RULES: &[Rule] = &[
    Rule::new("shift_zero_count", Domain::Integer, zero_count),
    Rule::new("shift_zero_value", Domain::Integer, zero_value),
    Rule::new("shift_normalize_count", Domain::Integer, normalize_count),
    Rule::new("shift_combine", Domain::Integer, combine),
    Rule::new("shift_clear_low_bits", Domain::Integer, clear_low_bits),
];

/// Shift count after masking to the operating width
fn masked_count(ctx: &OptimizeContext<'_>, node: &Node) -> Option<u32> {
    let width = op_width(ctx)?;
    let raw = ctx.int_constant(node)?;
    Some((raw & (width as i128 - 1)) as u32)
}

/// `x << 0 => x`, also for counts that mask to zero
fn zero_count(ctx: &OptimizeContext<'_>) -> Option<Node> {
    (masked_count(ctx, ctx.right)? == 0).then(|| ctx.left.clone())
}

/// `0 << n => 0`
fn zero_value(ctx: &OptimizeContext<'_>) -> Option<Node> {
    (is_zero(ctx, ctx.left) && ctx.is_pure(ctx.right))
        .then(|| ctx.zero())
        .flatten()
}

/// `x << 35 => x << 3` in 32 bits
fn normalize_count(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let masked = masked_count(ctx, ctx.right)?;
    let raw = ctx.int_constant(ctx.right)?;
    if raw == masked as i128 {
        return None;
    }
    Some(Node::binary(ctx.op, ctx.left.clone(), shift_count(masked)))
}

/// `(x << a) << b => x << (a + b)`. Counts past the width saturate: left
/// shifts and unsigned right shifts give zero, signed right shifts fill
/// with the sign bit.
fn combine(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (x, inner) = operands(ctx.left, ctx.op)?;
    if !ctx.has_op_type(ctx.left) {
        return None;
    }
    let width = op_width(ctx)?;
    let total = masked_count(ctx, inner)? + masked_count(ctx, ctx.right)?;
    if total < width {
        return Some(Node::binary(ctx.op, x.clone(), shift_count(total)));
    }
    if ctx.op == BinOp::Shr && ctx.is_signed() {
        return Some(Node::binary(BinOp::Shr, x.clone(), shift_count(width - 1)));
    }
    ctx.is_pure(x).then(|| ctx.zero()).flatten()
}

/// `(x >> n) << n => x & (~0 << n)`
fn clear_low_bits(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if ctx.op != BinOp::Shl {
        return None;
    }
    let (x, inner) = operands(ctx.left, BinOp::Shr)?;
    if !ctx.has_op_type(ctx.left) {
        return None;
    }
    let n = masked_count(ctx, ctx.right)?;
    if n == 0 || masked_count(ctx, inner)? != n {
        return None;
    }
    let mask = ctx.number(-1i128 << n)?;
    Some(Node::binary(BinOp::BitAnd, x.clone(), mask))
}
