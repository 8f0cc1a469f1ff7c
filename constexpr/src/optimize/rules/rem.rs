//! Remainder rules
//!
//! The remainder takes the sign of the dividend, so `x % -m == x % m` and
//! a dividend already inside `(-m, m)` is its own remainder.

use crate::ast::{BinOp, Node};
use crate::util;

use super::super::context::OptimizeContext;
use super::super::strategy::{Domain, Rule};
use super::{int_value, is_minus_one, is_one, is_zero, operands};

pub static RULES: &[Rule] = &[
    Rule::new("rem_by_one", Domain::Integer, by_one),
    Rule::new("rem_by_minus_one", Domain::Integer, by_minus_one),
    Rule::new("rem_zero_dividend", Domain::Integer, zero_dividend),
    Rule::new("rem_already_reduced", Domain::Integer, already_reduced),
    Rule::new("rem_nested", Domain::Integer, nested),
    Rule::new("rem_normalize_negative_divisor", Domain::Integer, normalize_negative_divisor),
    Rule::new("rem_power_of_two_to_mask", Domain::Integer, power_of_two_to_mask),
];

/// `x % 1 => 0`
fn by_one(ctx: &OptimizeContext<'_>) -> Option<Node> {
    (is_one(ctx, ctx.right) && ctx.is_pure(ctx.left))
        .then(|| ctx.zero())
        .flatten()
}

/// `x % -1 => 0` when `x` cannot be `MIN` (which traps)
fn by_minus_one(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !is_minus_one(ctx, ctx.right) || !ctx.is_pure(ctx.left) {
        return None;
    }
    let min = ctx.op_ty.as_ref()?.min_value()?;
    if ctx.ranges().interval(ctx.left)?.lo <= min {
        return None;
    }
    ctx.zero()
}

/// `0 % C => 0` for a non-zero constant `C`
fn zero_dividend(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let divisor = int_value(ctx, ctx.right)?;
    (is_zero(ctx, ctx.left) && divisor != 0).then(|| ctx.zero()).flatten()
}

/// `x % m => x` when `x` is proven to lie in `(-|m|, |m|)`
fn already_reduced(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let m = int_value(ctx, ctx.right)?.checked_abs()?;
    if m == 0 {
        return None;
    }
    let range = ctx.ranges().interval(ctx.left)?;
    (range.lo > -m && range.hi < m).then(|| ctx.left.clone())
}

/// `(x % m) % n => x % n` when `n` divides `m`
fn nested(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let (x, inner) = operands(ctx.left, BinOp::Rem)?;
    if !ctx.has_op_type(ctx.left) {
        return None;
    }
    let m = int_value(ctx, inner)?;
    let n = int_value(ctx, ctx.right)?;
    if m <= 0 || n <= 0 || m % n != 0 {
        return None;
    }
    Some(Node::binary(BinOp::Rem, x.clone(), ctx.right.clone()))
}

/// `x % -m => x % m`
fn normalize_negative_divisor(ctx: &OptimizeContext<'_>) -> Option<Node> {
    if !ctx.is_signed() {
        return None;
    }
    let m = int_value(ctx, ctx.right)?;
    if m >= -1 {
        return None;
    }
    Some(Node::binary(BinOp::Rem, ctx.left.clone(), ctx.number(-m)?))
}

/// `x % 2^n => x & (2^n - 1)` for non-negative `x`
fn power_of_two_to_mask(ctx: &OptimizeContext<'_>) -> Option<Node> {
    let divisor = int_value(ctx, ctx.right)?;
    let n = util::power_of_two_exponent(divisor)?;
    if n == 0 || !ctx.ranges().non_negative(ctx.left) {
        return None;
    }
    Some(Node::binary(BinOp::BitAnd, ctx.left.clone(), ctx.number(divisor - 1)?))
}
